use yew::prelude::*;

const REPOSITORY_URL: &str = "https://github.com/sadmann7/age-transition";

pub fn render_navbar() -> Html {
    html! {
        <header class="navbar" aria-label="navbar">
            <nav class="navbar-inner">
                <a class="navbar-link" aria-label="navigate to home page" href="/">
                    {"Age Transition"}
                </a>
                <a
                    class="navbar-link"
                    aria-label="navigate to github repo"
                    href={REPOSITORY_URL}
                    target="_blank"
                    rel="noreferrer"
                >
                    {"Repository"}
                </a>
            </nav>
        </header>
    }
}

pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1>{"Age transition with AI"}</h1>
            <p class="subtitle">
                {"Upload an image of a person and see the transition of their age from young to old"}
            </p>
        </header>
    }
}
