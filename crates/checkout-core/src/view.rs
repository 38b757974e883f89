//! Dialog View
//!
//! What the checkout dialog shows for a machine state. Rendering layers read
//! this instead of poking at the session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::machine::CheckoutMachine;
use crate::plan::{BillingCycle, Plan};
use crate::session::{CheckoutState, Outcome};

/// Render-ready dialog contents
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogView {
    pub state: CheckoutState,
    pub title: String,
    pub description: String,
    pub progress: u8,
    pub plan: Option<String>,
    pub price: Option<Decimal>,
    pub payment_method: Option<String>,
    pub outcome: Option<Outcome>,
    pub can_confirm: bool,
    pub can_retry: bool,
    pub can_close: bool,
}

impl DialogView {
    /// Project the machine. `staged` is the plan the dialog was opened for,
    /// shown while no session exists yet.
    pub fn render(machine: &CheckoutMachine, staged: Option<(&Plan, BillingCycle)>) -> Self {
        let state = machine.state();

        let Some(session) = machine.session() else {
            let (plan, price, description) = staged.map_or((None, None, String::new()), |(plan, cycle)| {
                let price = plan.price_for(cycle);
                (
                    Some(plan.name.clone()),
                    Some(price),
                    format!("{} plan - R$ {price}", plan.name),
                )
            });
            return Self {
                state,
                title: "Complete payment".into(),
                description,
                progress: 0,
                plan,
                price,
                payment_method: None,
                outcome: None,
                can_confirm: staged.is_some(),
                can_retry: false,
                can_close: true,
            };
        };

        let (title, description) = match state {
            CheckoutState::Idle | CheckoutState::Submitting => (
                "Submitting...".to_string(),
                "Validating your payment details...".to_string(),
            ),
            CheckoutState::Processing => (
                "Processing...".to_string(),
                format!(
                    "Please wait while we process your payment via {}",
                    session.method.label()
                ),
            ),
            CheckoutState::Succeeded => (
                "Payment approved!".to_string(),
                format!("You now have access to the {} plan", session.plan.name),
            ),
            CheckoutState::Failed => {
                let description = match &session.outcome {
                    Some(Outcome::PersistenceFailed { .. }) => {
                        "Payment approved but your subscription could not be saved."
                    }
                    _ => "Payment declined. Check your details and try again.",
                };
                ("Payment error".to_string(), description.to_string())
            }
        };

        Self {
            state,
            title,
            description,
            progress: session.progress.value(),
            plan: Some(session.plan.name.clone()),
            price: Some(session.price),
            payment_method: Some(session.method.label().to_string()),
            outcome: session.outcome.clone(),
            can_confirm: false,
            can_retry: state == CheckoutState::Failed,
            can_close: true,
        }
    }
}
