use super::super::{Model, Msg, Session};
use super::utils::debounce;
use shared::workflow::Submission;
use yew::prelude::*;

/// "Upload another image" once the job is over, plus "Download GIF" when it
/// succeeded and the browser has shown the final animation.
pub fn render_result_actions(model: &Model, ctx: &Context<Model>) -> Html {
    let Session::Generating { submission, .. } = &model.session else {
        return html! {};
    };
    if !submission.controls_ready(model.loaded_output.as_deref()) {
        return html! {};
    }

    let link = ctx.link().clone();
    let can_download =
        matches!(submission, Submission::Succeeded { .. }) && submission.output().is_some();

    html! {
        <div class="button-container">
            <button
                class="action-btn"
                aria-label="upload another image"
                onclick={debounce(300, {
                    let link = link.clone();
                    move || link.send_message(Msg::Reset)
                })}
            >
                {"Upload another image"}
            </button>
            if can_download {
                <button
                    class="action-btn primary"
                    aria-label="download image"
                    disabled={model.is_downloading}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Download)
                    })}
                >
                    { if model.is_downloading { "Loading..." } else { "Download GIF" } }
                </button>
            }
        </div>
    }
}
