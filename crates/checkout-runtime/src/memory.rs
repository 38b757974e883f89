//! In-Memory Collaborators
//!
//! Process-local implementations of the ports, for development, the demo
//! server and tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use checkout_core::{Notification, SubscriptionRecord, User, UserId};

use crate::ports::{
    IdentityProvider, Navigator, NotificationSink, SessionChange, SessionSubscription, StoreError,
    SubscriptionStore,
};

const SESSION_CHANNEL_CAPACITY: usize = 16;

/// One browser-like auth session: at most one signed-in user
pub struct MemoryIdentityProvider {
    user: RwLock<Option<User>>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(SESSION_CHANNEL_CAPACITY);
        Self {
            user: RwLock::new(None),
            changes,
        }
    }

    /// Provider with `email` already signed in
    pub fn signed_in(email: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.sign_in(email);
        provider
    }

    /// Sign a new user in, replacing any current one
    pub fn sign_in(&self, email: impl Into<String>) -> User {
        let user = User::new(email);
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
        tracing::info!(user_id = %user.id, email = %user.email, "Signed in");
        // No receivers is fine
        let _ = self.changes.send(SessionChange::SignedIn(user.clone()));
        user
    }

    pub fn sign_out(&self) {
        let previous = self.user.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(user) = previous {
            tracing::info!(user_id = %user.id, "Signed out");
            let _ = self.changes.send(SessionChange::SignedOut);
        }
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of live session-change subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_user(&self) -> Option<User> {
        self.user()
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }
}

/// Subscription store backed by a `Vec`
#[derive(Default)]
pub struct MemorySubscriptionStore {
    records: RwLock<Vec<SubscriptionRecord>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All stored records, oldest first
    pub fn records(&self) -> Vec<SubscriptionRecord> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn records_for(&self, user_id: &UserId) -> Vec<SubscriptionRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Insert calls received, including failed ones
    pub fn insert_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn insert(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }

        tracing::info!(
            user_id = %record.user_id,
            plan = %record.plan_name,
            price = %record.plan_price,
            payment_method = %record.payment_method,
            "Stored subscription"
        );
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}

/// Collects toasts until drained
#[derive(Default)]
pub struct MemoryNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Take everything sent so far
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn notify(&self, notification: Notification) {
        tracing::debug!(
            title = %notification.title,
            variant = ?notification.variant,
            "Notification"
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Records redirects instead of navigating
#[derive(Default)]
pub struct MemoryNavigator {
    redirects: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent redirect, consuming all recorded ones
    pub fn take_last(&self) -> Option<String> {
        std::mem::take(&mut *self.redirects.lock().unwrap_or_else(PoisonError::into_inner)).pop()
    }
}

impl Navigator for MemoryNavigator {
    fn redirect(&self, path: &str) {
        tracing::debug!(path, "Redirect");
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
