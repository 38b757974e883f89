//! # Checkout Runtime
//!
//! Async driver for the checkout state machine in `checkout-core`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  select_plan   ┌──────────────────────┐
//! │ PricingPage  │───────────────►│ CheckoutOrchestrator │
//! └──────┬───────┘                └──────────┬───────────┘
//!        │ login toast / redirect            │ reduce() + effects
//!        ▼                                   ▼
//! ┌──────────────┐   ┌──────────────┬──────────────┬──────────────┐
//! │  Navigator   │   │   Identity   │    Store     │ Notification │
//! └──────────────┘   └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! The orchestrator owns a single processing clock per session: progress
//! ticks and the charge resolution come from one schedule, and closing the
//! dialog aborts it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use checkout_core::{find_plan, BillingCycle, PaymentDetails, PaymentMethod};
//! use checkout_runtime::{
//!     CheckoutConfig, CheckoutOrchestrator, Collaborators, MemoryIdentityProvider,
//!     MemoryNotificationSink, MemorySubscriptionStore, ThreadRandom,
//! };
//!
//! #[tokio::main]
//! async fn main() -> checkout_core::Result<()> {
//!     let collaborators = Collaborators {
//!         identity: Arc::new(MemoryIdentityProvider::signed_in("ana@example.com")),
//!         store: Arc::new(MemorySubscriptionStore::new()),
//!         notifier: Arc::new(MemoryNotificationSink::new()),
//!         random: Arc::new(ThreadRandom),
//!     };
//!
//!     let dialog = CheckoutOrchestrator::new(CheckoutConfig::default(), collaborators, || {}, || {});
//!     dialog.mount().await;
//!
//!     let plan = find_plan("Professional").expect("catalog plan");
//!     dialog.confirm(plan, BillingCycle::Annual, PaymentMethod::Pix, PaymentDetails::default())?;
//!     dialog.start()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod memory;
pub mod orchestrator;
pub mod page;
pub mod ports;
pub mod random;
pub mod reporter;

pub use config::CheckoutConfig;
pub use memory::{
    MemoryIdentityProvider, MemoryNavigator, MemoryNotificationSink, MemorySubscriptionStore,
};
pub use orchestrator::{CheckoutOrchestrator, Collaborators};
pub use page::PricingPage;
pub use ports::{
    IdentityProvider, Navigator, NotificationSink, RandomSource, SessionChange,
    SessionSubscription, StoreError, SubscriptionStore,
};
pub use random::{FixedRandom, ThreadRandom};
pub use reporter::{ProgressReporter, SessionSnapshot};
