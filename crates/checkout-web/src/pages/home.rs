//! Home Page

use leptos::prelude::*;

#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="home">
            <header class="hero">
                <h1>"Launch faster"</h1>
                <p class="tagline">"Everything your team needs to ship, on one subscription"</p>
                <div class="cta">
                    <a href="/pricing" class="btn btn-primary">"View Plans"</a>
                    <a href="/auth" class="btn">"Sign In"</a>
                </div>
            </header>
        </div>
    }
}
