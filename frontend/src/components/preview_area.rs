use super::super::{Model, Msg, Session};
use shared::workflow::Submission;
use yew::prelude::*;

pub fn render_preview_area(model: &Model, ctx: &Context<Model>) -> Html {
    let Session::Generating {
        file_name,
        original_url,
        submission,
        ..
    } = &model.session
    else {
        return html! {};
    };

    html! {
        <div id="preview-container" class="preview-grid">
            <div class="preview-panel">
                <h2>{"Original image"}</h2>
                <img
                    src={original_url.clone()}
                    alt={file_name.clone()}
                    width="480"
                    height="480"
                    class="preview-image"
                />
            </div>
            <div class="preview-panel">
                <h2>{"Generated GIF"}</h2>
                { render_generated(ctx, file_name, submission) }
            </div>
        </div>
    }
}

fn render_generated(ctx: &Context<Model>, file_name: &str, submission: &Submission) -> Html {
    if let Some(output) = submission.output() {
        let src = output.to_string();
        let onload = ctx.link().callback({
            let src = src.clone();
            move |_: Event| Msg::OutputLoaded(src.clone())
        });
        return html! {
            <img
                src={src}
                {onload}
                alt={file_name.to_string()}
                width="480"
                height="480"
                class="preview-image"
            />
        };
    }

    match submission.error() {
        Some(error) => html! {
            <div class="generation-failed">
                <p>{ error.to_string() }</p>
            </div>
        },
        None => render_skeleton(),
    }
}

fn render_skeleton() -> Html {
    html! {
        <div class="skeleton" aria-busy="true">
            <div class="skeleton-pulse"></div>
        </div>
    }
}
