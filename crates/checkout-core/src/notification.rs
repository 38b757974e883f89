//! Notifications
//!
//! Toast messages sent to the notification sink.

use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Visual style of a toast
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Default,
    Destructive,
}

/// Whether a notification reports a success or an error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A single toast
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }

    pub const fn kind(&self) -> NotificationKind {
        match self.variant {
            Variant::Default => NotificationKind::Success,
            Variant::Destructive => NotificationKind::Error,
        }
    }

    pub fn payment_approved(plan_name: &str) -> Self {
        Self::success("Payment approved", format!("Welcome to the {plan_name} plan!"))
    }

    pub fn payment_declined() -> Self {
        Self::error("Payment declined", "Please try again with another method.")
    }

    pub fn persistence_failed() -> Self {
        Self::error(
            "Subscription not activated",
            "Your payment was approved but we could not activate your plan. Please contact support.",
        )
    }

    pub fn missing_details(fields: &[&str]) -> Self {
        Self::error("Missing payment details", format!("Fill in: {}", fields.join(", ")))
    }

    pub fn login_required() -> Self {
        Self::error("Login required", "Sign in to subscribe to a plan.")
    }

    pub fn subscription_activated() -> Self {
        Self::success("Subscription activated!", "Welcome to your new plan!")
    }

    /// Toast for an error raised before a session exists
    pub fn for_error(error: &CheckoutError) -> Self {
        match error {
            CheckoutError::Validation { fields } => Self::missing_details(fields),
            CheckoutError::AuthRequired => Self::login_required(),
            CheckoutError::Declined => Self::payment_declined(),
            CheckoutError::Persistence(_) => Self::persistence_failed(),
            other => Self::error("Checkout error", other.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            Notification::payment_approved("Starter").kind(),
            NotificationKind::Success
        );
        assert_eq!(Notification::payment_declined().kind(), NotificationKind::Error);
    }

    #[test]
    fn test_wire_variant() {
        let json = serde_json::to_value(Notification::login_required()).unwrap();
        assert_eq!(json["variant"], "destructive");
        assert_eq!(json["title"], "Login required");
    }

    #[test]
    fn test_store_failure_differs_from_decline() {
        let declined = Notification::for_error(&CheckoutError::Declined);
        let failed = Notification::for_error(&CheckoutError::Persistence("x".into()));
        assert_ne!(declined.title, failed.title);
    }
}
