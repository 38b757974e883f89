//! Collaborator Ports
//!
//! Contracts for the services the checkout depends on but does not own.
//! Implement these for a real identity provider, database, toast system,
//! router and RNG; `crate::memory` and `crate::random` carry in-process ones.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use checkout_core::{CheckoutError, Notification, SubscriptionRecord, User};

/// Authentication state change
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn(User),
    SignedOut,
}

/// Live subscription to session changes. Dropping it unsubscribes.
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    pub const fn new(receiver: broadcast::Receiver<SessionChange>) -> Self {
        Self { receiver }
    }

    /// Next change, or `None` once the provider is gone
    pub async fn next(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session change subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Supplies the current user and auth-change events
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Currently authenticated user
    async fn current_user(&self) -> Option<User>;

    /// Subscribe to sign-in / sign-out events
    fn subscribe(&self) -> SessionSubscription;
}

/// Subscription store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Store refused the record
    #[error("Record rejected: {0}")]
    Rejected(String),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Persists subscription records
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Write one record
    async fn insert(&self, record: SubscriptionRecord) -> Result<(), StoreError>;
}

/// Receives user-visible toasts
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Moves the user to another page
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Uniform random draws in `[0, 1)`
pub trait RandomSource: Send + Sync {
    fn draw(&self) -> f64;
}
