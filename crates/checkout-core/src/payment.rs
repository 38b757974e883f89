//! Payment Methods
//!
//! The simulated methods offered in the checkout dialog and the details
//! collected for them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// How the user chose to pay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "credit-card")]
    Card,
    Pix,
    DigitalWallet,
}

impl PaymentMethod {
    /// Normalized label written to the subscription record
    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::Pix => "Pix",
            Self::DigitalWallet => "Digital Wallet",
        }
    }

    pub const fn requires_card_details(self) -> bool {
        matches!(self, Self::Card)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = CheckoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "card" | "credit-card" => Ok(Self::Card),
            "pix" => Ok(Self::Pix),
            "digital-wallet" | "digital wallet" => Ok(Self::DigitalWallet),
            other => Err(CheckoutError::InvalidPaymentMethod(other.to_string())),
        }
    }
}

/// Form fields of the payment dialog
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentDetails {
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    pub cardholder_name: String,
    pub email: String,
    pub phone: String,
}

impl PaymentDetails {
    /// Card details for the card form
    pub fn card(
        number: impl Into<String>,
        expiry: impl Into<String>,
        cvv: impl Into<String>,
    ) -> Self {
        Self {
            card_number: number.into(),
            expiry: expiry.into(),
            cvv: cvv.into(),
            ..Default::default()
        }
    }

    /// Names of required fields left blank for this method
    pub fn missing_fields(&self, method: PaymentMethod) -> Vec<&'static str> {
        if !method.requires_card_details() {
            return Vec::new();
        }

        [
            ("card number", &self.card_number),
            ("expiry", &self.expiry),
            ("cvv", &self.cvv),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Reject a card payment with blank card fields. Other methods always pass.
    pub fn validate(&self, method: PaymentMethod) -> Result<()> {
        let fields = self.missing_fields(method);
        if fields.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation { fields })
        }
    }

    /// Last four digits of the card, for display
    pub fn masked_card_number(&self) -> Option<String> {
        let digits: Vec<char> = self.card_number.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 4 {
            return None;
        }
        let last4: String = digits[digits.len() - 4..].iter().collect();
        Some(format!("•••• {last4}"))
    }
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card_number", &self.masked_card_number())
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .field("cardholder_name", &self.cardholder_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(PaymentMethod::Card.label(), "Card");
        assert_eq!(PaymentMethod::Pix.label(), "Pix");
        assert_eq!(PaymentMethod::DigitalWallet.label(), "Digital Wallet");
    }

    #[test]
    fn test_card_requires_fields() {
        let err = PaymentDetails::default()
            .validate(PaymentMethod::Card)
            .unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation {
                fields: vec!["card number", "expiry", "cvv"]
            }
        );

        let details = PaymentDetails::card("4242 4242 4242 4242", "12/30", " ");
        assert_eq!(details.missing_fields(PaymentMethod::Card), vec!["cvv"]);
    }

    #[test]
    fn test_other_methods_never_blocked() {
        let empty = PaymentDetails::default();
        assert!(empty.validate(PaymentMethod::Pix).is_ok());
        assert!(empty.validate(PaymentMethod::DigitalWallet).is_ok());
    }

    #[test]
    fn test_debug_hides_card_data() {
        let details = PaymentDetails::card("4242 4242 4242 1234", "12/30", "987");
        let debug = format!("{details:?}");
        assert!(debug.contains("1234"));
        assert!(!debug.contains("4242 4242"));
        assert!(!debug.contains("987"));
    }

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("credit-card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        let method: PaymentMethod = serde_json::from_str("\"digital-wallet\"").unwrap();
        assert_eq!(method, PaymentMethod::DigitalWallet);
    }
}
