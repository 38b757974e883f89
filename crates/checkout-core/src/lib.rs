//! # checkout-core
//!
//! Plan catalog, pricing and the simulated checkout state machine.
//!
//! Everything here is pure: no timers, no I/O. The runtime crate owns the
//! clock and the collaborators and feeds events through [`reduce`].
//!
//! ## Checkout flow
//!
//! ```text
//! ┌──────────┐ confirm ┌────────────┐ start ┌────────────┐ resolve ┌───────────┐
//! │   Idle   │────────▶│ Submitting │──────▶│ Processing │────────▶│ Succeeded │
//! └──────────┘         └────────────┘       └────────────┘         └───────────┘
//!      ▲                                          │                      │
//!      │ retry          ┌────────────┐            │ declined /           │ auto-close
//!      └────────────────│   Failed   │◀───────────┘ store failure        │ (2s)
//!      ▲                └────────────┘                                   │
//!      └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use checkout_core::{find_plan, price_for, BillingCycle};
//! use rust_decimal_macros::dec;
//!
//! let pro = find_plan("Professional").unwrap();
//! assert_eq!(price_for(pro, BillingCycle::Annual), dec!(790));
//! ```

pub mod clock;
pub mod error;
pub mod machine;
pub mod notification;
pub mod payment;
pub mod plan;
pub mod session;
pub mod view;

pub use clock::{ClockEvent, ClockSchedule};
pub use error::{CheckoutError, Result};
pub use machine::{
    reduce, CheckoutEvent, CheckoutIntent, CheckoutMachine, CheckoutPolicy, Disposition, Effect,
    Transition,
};
pub use notification::{Notification, NotificationKind, Variant};
pub use payment::{PaymentDetails, PaymentMethod};
pub use plan::{find_plan, list_plans, popular_plan, price_for, quotes, BillingCycle, Plan, PlanQuote};
pub use session::{
    CheckoutSession, CheckoutState, Outcome, Progress, SessionId, SubscriptionRecord, User, UserId,
};
pub use view::DialogView;
