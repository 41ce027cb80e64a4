use super::super::{Model, Msg};
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::FileList;
use yew::prelude::*;

// Debounce function to limit button events
pub fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));

    Callback::from(move |_| {
        let mut timeout_ref = timeout.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || {
            inner_callback();
        }));
    })
}

/// Every file in the list; type and size checks happen later.
pub fn files_from_list(file_list: &FileList) -> Vec<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .map(GlooFile::from)
        .collect()
}

pub fn render_notices(model: &Model, ctx: &Context<Model>) -> Html {
    if model.notices.is_empty() {
        return html! {};
    }

    html! {
        <div class="notice-stack">
            {
                model.notices.iter().map(|notice| {
                    let id = notice.id;
                    html! {
                        <div class="error-message" key={id.to_string()}>
                            <p>{ &notice.message }</p>
                            <button
                                class="notice-close"
                                aria-label="dismiss"
                                onclick={ctx.link().callback(move |_| Msg::DismissNotice(id))}
                            >
                                {"×"}
                            </button>
                        </div>
                    }
                }).collect::<Html>()
            }
        </div>
    }
}
