//! Checkout Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Checkout-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Required payment fields are missing
    #[error("Missing payment details: {}", .fields.join(", "))]
    Validation { fields: Vec<&'static str> },

    /// The simulated charge was declined
    #[error("Payment declined")]
    Declined,

    /// The charge was approved but the subscription could not be stored
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Checkout attempted without an authenticated user
    #[error("Authentication required")]
    AuthRequired,

    /// Plan name not in the catalog
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    /// Billing cycle could not be parsed
    #[error("Invalid billing cycle: {0}")]
    InvalidCycle(String),

    /// Payment method could not be parsed
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    /// No checkout dialog is open
    #[error("Checkout session not found: {0}")]
    SessionNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CheckoutError {
    /// Check if the user can recover by trying again
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Declined | Self::Persistence(_) | Self::Validation { .. }
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { fields } => format!("Fill in: {}", fields.join(", ")),
            Self::Declined => "Payment declined. Check your details and try again.".into(),
            Self::Persistence(_) => {
                "Payment approved but your subscription could not be saved.".into()
            }
            Self::AuthRequired => "Sign in to subscribe to a plan.".into(),
            Self::UnknownPlan(name) => format!("The plan '{name}' is not available."),
            Self::SessionNotFound(_) => "No checkout in progress.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let err = CheckoutError::Validation {
            fields: vec!["card number", "cvv"],
        };
        assert_eq!(err.to_string(), "Missing payment details: card number, cvv");
        assert_eq!(err.user_message(), "Fill in: card number, cvv");
    }

    #[test]
    fn test_retryable() {
        assert!(CheckoutError::Declined.is_retryable());
        assert!(CheckoutError::Persistence("down".into()).is_retryable());
        assert!(!CheckoutError::AuthRequired.is_retryable());
    }

    #[test]
    fn test_persistence_is_not_reported_as_decline() {
        let message = CheckoutError::Persistence("disk full".into()).user_message();
        assert!(!message.contains("declined"));
    }
}
