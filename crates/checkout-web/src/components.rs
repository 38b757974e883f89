//! UI Components

use leptos::prelude::*;

use checkout_core::{
    BillingCycle, CheckoutMachine, CheckoutState, DialogView, Notification, PaymentDetails,
    PaymentMethod, Plan, Variant,
};

/// One pricing tier
#[component]
pub fn PlanCard(
    plan: &'static Plan,
    #[prop(into)] cycle: Signal<BillingCycle>,
    on_select: Callback<&'static Plan>,
) -> impl IntoView {
    let class = if plan.popular { "plan featured" } else { "plan" };
    let price = move || format!("R$ {}", plan.price_for(cycle.get()));
    let period = move || format!("/{}", cycle.get().period_label());

    view! {
        <div class=class>
            <Show when=move || plan.popular>
                <span class="badge">"Most popular"</span>
            </Show>
            <h2>{plan.name.clone()}</h2>
            <p class="description">{plan.description.clone()}</p>
            <div class="price">
                {plan.list_price.map(|list| view! { <s class="list-price">{format!("R$ {list}")}</s> })}
                {price}
                <span>{period}</span>
            </div>
            <ul>
                {plan.features.iter().map(|f| view! { <li>{f.clone()}</li> }).collect_view()}
            </ul>
            <button
                class=if plan.popular { "btn btn-primary" } else { "btn" }
                on:click=move |_| on_select.run(plan)
            >
                {plan.call_to_action()}
            </button>
        </div>
    }
}

/// Payment dialog for the selected plan
#[component]
pub fn CheckoutDialog(
    plan: &'static Plan,
    #[prop(into)] cycle: Signal<BillingCycle>,
    /// Latest view from the server; `None` until confirmed
    #[prop(into)] view: Signal<Option<DialogView>>,
    on_confirm: Callback<(PaymentMethod, PaymentDetails)>,
    on_retry: Callback<()>,
    on_close: Callback<()>,
) -> impl IntoView {
    let (method, set_method) = signal(PaymentMethod::Card);
    let (card_number, set_card_number) = signal(String::new());
    let (expiry, set_expiry) = signal(String::new());
    let (cvv, set_cvv) = signal(String::new());

    let current = Memo::new(move |_| {
        view.get()
            .unwrap_or_else(|| DialogView::render(&CheckoutMachine::new(), Some((plan, cycle.get()))))
    });
    let state = move || current.with(|v| v.state);
    let busy = move || matches!(state(), CheckoutState::Submitting | CheckoutState::Processing);

    let confirm = move |_| {
        let details = PaymentDetails::card(card_number.get(), expiry.get(), cvv.get());
        on_confirm.run((method.get(), details));
    };

    let method_button = move |option: PaymentMethod| {
        view! {
            <button
                class=move || if method.get() == option { "method selected" } else { "method" }
                disabled=busy
                on:click=move |_| set_method.set(option)
            >
                {option.label()}
            </button>
        }
    };

    view! {
        <div class="dialog-backdrop">
            <div class="dialog" role="dialog">
                <header>
                    <h2>{move || current.with(|v| v.title.clone())}</h2>
                    <p>{move || current.with(|v| v.description.clone())}</p>
                </header>

                <Show when=move || state() == CheckoutState::Idle>
                    <div class="methods">
                        {method_button(PaymentMethod::Card)}
                        {method_button(PaymentMethod::Pix)}
                        {method_button(PaymentMethod::DigitalWallet)}
                    </div>
                    <Show when=move || method.get().requires_card_details()>
                        <div class="card-fields">
                            <input
                                placeholder="Card number"
                                prop:value=move || card_number.get()
                                on:input=move |ev| set_card_number.set(event_target_value(&ev))
                            />
                            <input
                                placeholder="MM/YY"
                                prop:value=move || expiry.get()
                                on:input=move |ev| set_expiry.set(event_target_value(&ev))
                            />
                            <input
                                placeholder="CVV"
                                prop:value=move || cvv.get()
                                on:input=move |ev| set_cvv.set(event_target_value(&ev))
                            />
                        </div>
                    </Show>
                </Show>

                <Show when=move || state() == CheckoutState::Processing>
                    <div class="progress">
                        <div
                            class="progress-bar"
                            style=move || format!("width: {}%", current.with(|v| v.progress))
                        />
                    </div>
                </Show>

                <footer>
                    <Show when=move || current.with(|v| v.can_confirm)>
                        <button class="btn btn-primary" on:click=confirm>
                            "Confirm payment"
                        </button>
                    </Show>
                    <Show when=move || current.with(|v| v.can_retry)>
                        <button class="btn btn-primary" on:click=move |_| on_retry.run(())>
                            "Try again"
                        </button>
                    </Show>
                    <button class="btn" on:click=move |_| on_close.run(())>
                        "Close"
                    </button>
                </footer>
            </div>
        </div>
    }
}

/// Toast stack
#[component]
pub fn Toasts(#[prop(into)] notifications: Signal<Vec<Notification>>) -> impl IntoView {
    view! {
        <div class="toasts">
            <For
                each=move || notifications.get().into_iter().enumerate()
                key=|(i, n)| format!("{i}-{}", n.title)
                children=move |(_, n)| {
                    let class = match n.variant {
                        Variant::Destructive => "toast toast-destructive",
                        Variant::Default => "toast",
                    };
                    view! {
                        <div class=class>
                            <strong>{n.title.clone()}</strong>
                            <p>{n.description.clone()}</p>
                        </div>
                    }
                }
            />
        </div>
    }
}
