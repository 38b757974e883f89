//! Sign-in Page

use leptos::prelude::*;

use crate::api;

#[component]
pub fn AuthPage() -> impl IntoView {
    let (email, set_email) = signal(String::new());
    let (error, set_error) = signal(None::<String>);
    let (loading, set_loading) = signal(false);
    let signed_in = api::token().is_some();

    let submit = move |_| {
        let address = email.get();
        if address.trim().is_empty() || loading.get() {
            return;
        }
        set_loading.set(true);
        leptos::task::spawn_local(async move {
            match api::sign_in(&address).await {
                Ok(_) => api::redirect("/pricing"),
                Err(e) => set_error.set(Some(e.message())),
            }
            set_loading.set(false);
        });
    };

    let sign_out = move |_| {
        leptos::task::spawn_local(async move {
            api::sign_out().await;
            api::redirect("/auth");
        });
    };

    view! {
        <div class="auth">
            <h1>"Sign in"</h1>
            <Show when=move || signed_in>
                <p>"You are already signed in."</p>
                <button class="btn" on:click=sign_out>"Sign out"</button>
            </Show>
            <div class="field">
                <label>"Email"</label>
                <input
                    type="email"
                    placeholder="you@example.com"
                    prop:value=move || email.get()
                    on:input=move |ev| set_email.set(event_target_value(&ev))
                />
            </div>
            <button class="btn btn-primary" on:click=submit disabled=move || loading.get()>
                {move || if loading.get() { "..." } else { "Continue" }}
            </button>
            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
        </div>
    }
}
