use yew::prelude::*;

const REPLICATE_URL: &str = "https://replicate.com/";
const AUTHOR_URL: &str = "https://github.com/sadmann7";

pub fn render_footer() -> Html {
    html! {
        <footer class="app-footer" aria-label="footer">
            <p class="footer-credit">
                {"Made with "}
                <a
                    aria-label="navigate to replicate"
                    href={REPLICATE_URL}
                    target="_blank"
                    rel="noreferrer"
                >
                    {"Replicate"}
                </a>
            </p>
            <a
                class="footer-link"
                aria-label="navigate to github repo"
                href={AUTHOR_URL}
                target="_blank"
                rel="noreferrer"
            >
                {"GitHub"}
            </a>
        </footer>
    }
}
