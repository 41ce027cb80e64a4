use super::super::{Model, Msg, Session};
use super::utils::files_from_list;
use shared::upload::ACCEPTED_MIME;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    let is_uploading = matches!(model.session, Session::Uploading { .. });
    html! {
        <div class="upload-section">
            { render_drop_zone(model, ctx, is_uploading) }
        </div>
    }
}

fn render_drop_zone(model: &Model, ctx: &Context<Model>, is_uploading: bool) -> Html {
    let link = ctx.link();
    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let files = input.files().as_ref().map(files_from_list).unwrap_or_default();

        input.set_value("");
        Msg::FilesPicked(files)
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(move |_: MouseEvent| {
        if is_uploading {
            return;
        }
        let input = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("file-input"));
        if let Some(input) = input {
            if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                html_input.click();
            }
        }
    });

    let prompt = if model.is_dragging {
        "Drop the files here ..."
    } else if is_uploading {
        "Uploading..."
    } else {
        "Drag 'n' drop image here, or click to select image"
    };

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept={ACCEPTED_MIME}
                style="display: none;"
                onchange={handle_change}
            />

            <div
                id="drop-zone"
                class={classes!(
                    "upload-area",
                    model.is_dragging.then_some("drag-over"),
                    is_uploading.then_some("uploading")
                )}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={trigger_file_input}
            >
                <div class="upload-placeholder">
                    <p>{ prompt }</p>
                    <p class="file-types">{"Images up to 1MB"}</p>
                </div>
            </div>
        </>
    }
}
