//! Checkout Session
//!
//! The value captured when a user confirms a plan, and the record written
//! once the simulated charge goes through.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payment::{PaymentDetails, PaymentMethod};
use crate::plan::{BillingCycle, Plan};

/// Unique checkout session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity-provider user id
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
        }
    }
}

/// Checkout dialog state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    Processing,
    Succeeded,
    Failed,
}

impl CheckoutState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress bar value, 0 to 100
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    /// Advance by `step`, capped at 100. Never goes backwards.
    #[must_use]
    pub const fn advance(self, step: u8) -> Self {
        let next = self.0.saturating_add(step);
        if next > Self::COMPLETE.0 {
            Self::COMPLETE
        } else {
            Self(next)
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn is_complete(self) -> bool {
        self.0 >= Self::COMPLETE.0
    }
}

/// How a resolved session ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The simulated charge was approved
    Approved,

    /// The simulated charge was declined
    Declined,

    /// Approved, but the subscription record could not be written
    PersistenceFailed { reason: String },
}

impl Outcome {
    /// The error this outcome represents, if any
    pub fn error(&self) -> Option<crate::error::CheckoutError> {
        match self {
            Self::Approved => None,
            Self::Declined => Some(crate::error::CheckoutError::Declined),
            Self::PersistenceFailed { reason } => {
                Some(crate::error::CheckoutError::Persistence(reason.clone()))
            }
        }
    }
}

/// One user's attempt to subscribe to a plan
#[derive(Clone, Debug)]
pub struct CheckoutSession {
    /// Unique identifier
    pub id: SessionId,

    /// Who is subscribing
    pub user_id: UserId,

    /// Plan selected at confirmation
    pub plan: Plan,

    /// Billing cycle selected at confirmation
    pub cycle: BillingCycle,

    /// Price captured at confirmation
    pub price: Decimal,

    /// Payment method
    pub method: PaymentMethod,

    /// Payment form contents
    pub details: PaymentDetails,

    /// Current state (never `Idle` while the session exists)
    pub state: CheckoutState,

    /// Progress bar
    pub progress: Progress,

    /// Resolution, once drawn
    pub outcome: Option<Outcome>,

    /// Confirmation timestamp
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Capture a confirmed session. The price is fixed here.
    pub fn confirmed(
        user_id: UserId,
        plan: Plan,
        cycle: BillingCycle,
        method: PaymentMethod,
        details: PaymentDetails,
    ) -> Self {
        let price = plan.price_for(cycle);
        Self {
            id: SessionId::new(),
            user_id,
            plan,
            cycle,
            price,
            method,
            details,
            state: CheckoutState::Submitting,
            progress: Progress::ZERO,
            outcome: None,
            created_at: Utc::now(),
        }
    }

    /// The record to persist for this session
    pub fn record(&self) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: self.user_id.clone(),
            plan_name: self.plan.name.clone(),
            plan_price: self.price,
            payment_method: self.method.label().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Row written to the subscription store on success
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub plan_name: String,
    pub plan_price: Decimal,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}
