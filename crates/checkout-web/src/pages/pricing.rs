//! Pricing Page

use std::time::Duration;

use leptos::prelude::*;

use checkout_core::{
    list_plans, popular_plan, BillingCycle, CheckoutState, DialogView, Notification,
    PaymentDetails, PaymentMethod, Plan,
};

use crate::api::{self, ApiFailure};
use crate::components::{CheckoutDialog, PlanCard, Toasts};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_TOASTS: usize = 3;

#[component]
pub fn PricingPage() -> impl IntoView {
    let cycle = RwSignal::new(BillingCycle::Monthly);
    let selected = RwSignal::new(None::<&'static Plan>);
    let dialog_view = RwSignal::new(None::<DialogView>);
    let toasts = RwSignal::new(Vec::<Notification>::new());
    let polling = RwSignal::new(false);
    // Set once a successful dialog is gone and only the redirect is pending
    let finishing = RwSignal::new(false);

    let toast = move |notification: Notification| {
        toasts.update(|t| {
            t.push(notification);
            if t.len() > MAX_TOASTS {
                t.remove(0);
            }
        });
    };

    let auth_required = move || {
        toast(Notification::login_required());
        polling.set(false);
        selected.set(None);
        api::redirect("/auth");
    };

    let poll = move || {
        leptos::task::spawn_local(async move {
            match api::poll_checkout().await {
                Ok(status) => {
                    for notification in status.notifications {
                        toast(notification);
                    }

                    let previous = dialog_view.get_untracked().map(|v| v.state);
                    let next = status.view.as_ref().map(|v| v.state);
                    match (previous, next) {
                        // Dismissed itself after success; keep polling for the redirect
                        (Some(CheckoutState::Succeeded), None) => {
                            selected.set(None);
                            finishing.set(true);
                        }
                        (_, None) if finishing.get_untracked() => {}
                        // Closed by the server, e.g. after signing out elsewhere
                        (Some(CheckoutState::Processing), Some(CheckoutState::Idle)) | (_, None) => {
                            selected.set(None);
                            polling.set(false);
                        }
                        (_, Some(CheckoutState::Failed)) => polling.set(false),
                        _ => {}
                    }
                    dialog_view.set(status.view);

                    if let Some(path) = status.redirect {
                        polling.set(false);
                        finishing.set(false);
                        api::redirect(&path);
                    }
                }
                Err(ApiFailure::AuthRequired) => auth_required(),
                Err(e) => {
                    polling.set(false);
                    toast(Notification::error("Payment error", e.message()));
                }
            }
        });
    };

    match set_interval_with_handle(
        move || {
            if polling.get_untracked() {
                poll();
            }
        },
        POLL_INTERVAL,
    ) {
        Ok(handle) => on_cleanup(move || handle.clear()),
        Err(_) => leptos::logging::warn!("Could not start checkout polling"),
    }

    let on_select = Callback::new(move |plan: &'static Plan| {
        if api::token().is_none() {
            auth_required();
            return;
        }
        dialog_view.set(None);
        finishing.set(false);
        selected.set(Some(plan));
    });

    let on_confirm = Callback::new(move |(method, details): (PaymentMethod, PaymentDetails)| {
        let Some(plan) = selected.get_untracked() else {
            return;
        };
        let missing = details.missing_fields(method);
        if !missing.is_empty() {
            toast(Notification::missing_details(&missing));
            return;
        }

        let at = cycle.get_untracked();
        leptos::task::spawn_local(async move {
            match api::start_checkout(&plan.name, at, method, &details).await {
                Ok(started) => {
                    dialog_view.set(started.view);
                    polling.set(true);
                }
                Err(ApiFailure::AuthRequired) => auth_required(),
                Err(e) => toast(Notification::error("Payment error", e.message())),
            }
        });
    });

    let on_retry = Callback::new(move |()| {
        leptos::task::spawn_local(async move {
            match api::retry_checkout().await {
                Ok(view) => dialog_view.set(Some(view)),
                Err(ApiFailure::AuthRequired) => auth_required(),
                Err(e) => toast(Notification::error("Payment error", e.message())),
            }
        });
    });

    let on_close = Callback::new(move |()| {
        polling.set(false);
        selected.set(None);
        dialog_view.set(None);
        leptos::task::spawn_local(api::close_checkout());
    });

    let savings = popular_plan()
        .map(Plan::annual_savings_percent)
        .unwrap_or_default();

    view! {
        <div class="pricing">
            <h1>"Pricing"</h1>
            <p class="subtitle">"Pick the plan that fits your team"</p>

            <div class="cycle-toggle">
                <span class=move || if cycle.get() == BillingCycle::Monthly { "active" } else { "" }>
                    "Monthly"
                </span>
                <button
                    class="switch"
                    role="switch"
                    aria-checked=move || (cycle.get() == BillingCycle::Annual).to_string()
                    on:click=move |_| cycle.update(|c| *c = c.toggle())
                />
                <span class=move || if cycle.get() == BillingCycle::Annual { "active" } else { "" }>
                    "Annual"
                </span>
                <span class="badge savings">{format!("Save {savings}%")}</span>
            </div>

            <div class="plans">
                {list_plans()
                    .iter()
                    .map(|plan| view! { <PlanCard plan=plan cycle=cycle on_select=on_select /> })
                    .collect_view()}
            </div>

            {move || {
                selected
                    .get()
                    .map(|plan| {
                        view! {
                            <CheckoutDialog
                                plan=plan
                                cycle=cycle
                                view=dialog_view
                                on_confirm=on_confirm
                                on_retry=on_retry
                                on_close=on_close
                            />
                        }
                    })
            }}

            <Toasts notifications=toasts />
        </div>
    }
}
