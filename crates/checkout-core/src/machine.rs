//! Checkout State Machine
//!
//! A pure reducer: `(machine, event) -> transition`. The runtime feeds it
//! clock, store and user events and executes the returned effects.
//!
//! ```text
//!  Idle ──confirm──▶ Submitting ──start──▶ Processing ──resolve──▶ Succeeded ──auto-close──▶ Idle
//!   ▲                                          │
//!   └──────────────retry────────── Failed ◀────┘ (declined / store failure)
//! ```

use std::time::Duration;

use crate::error::{CheckoutError, Result};
use crate::notification::Notification;
use crate::payment::{PaymentDetails, PaymentMethod};
use crate::plan::{BillingCycle, Plan};
use crate::session::{CheckoutSession, CheckoutState, Outcome, Progress, SubscriptionRecord, UserId};

/// Tunables the reducer needs
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutPolicy {
    /// Progress units added per tick
    pub tick_step: u8,

    /// Draws at or above this value approve the charge
    pub success_threshold: f64,

    /// Delay between Succeeded and the automatic close
    pub auto_close_after: Duration,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            tick_step: 10,
            success_threshold: 0.1,
            auto_close_after: Duration::from_secs(2),
        }
    }
}

impl CheckoutPolicy {
    pub fn approves(&self, draw: f64) -> bool {
        draw >= self.success_threshold
    }
}

/// What the user confirmed in the payment form
#[derive(Clone, Debug)]
pub struct CheckoutIntent {
    /// Current user, `None` when signed out
    pub user: Option<UserId>,
    pub plan: Plan,
    pub cycle: BillingCycle,
    pub method: PaymentMethod,
    pub details: PaymentDetails,
}

/// Inputs to the reducer
#[derive(Clone, Debug)]
pub enum CheckoutEvent {
    Confirm(Box<CheckoutIntent>),
    Start,
    Tick,
    Resolve { draw: f64 },
    Persisted,
    PersistFailed { reason: String },
    AutoClose,
    Retry,
    Close,
}

impl CheckoutEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Confirm(_) => "confirm",
            Self::Start => "start",
            Self::Tick => "tick",
            Self::Resolve { .. } => "resolve",
            Self::Persisted => "persisted",
            Self::PersistFailed { .. } => "persist_failed",
            Self::AutoClose => "auto_close",
            Self::Retry => "retry",
            Self::Close => "close",
        }
    }
}

/// Side effects the runtime must carry out
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Begin the Processing clock
    StartClock,

    /// Stop any running clock or timer
    CancelClock,

    /// Write the subscription record
    Persist(SubscriptionRecord),

    /// Send a toast
    Notify(Notification),

    /// Fire `AutoClose` after the delay
    ScheduleAutoClose(Duration),

    /// Call the dialog's success callback
    InvokeOnSuccess,

    /// Ask the host to dismiss the dialog
    InvokeOnClose,
}

/// Whether the reducer acted on an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    Ignored,
}

/// Result of reducing one event
#[derive(Clone, Debug)]
pub struct Transition {
    pub machine: CheckoutMachine,
    pub effects: Vec<Effect>,
    pub disposition: Disposition,
}

impl Transition {
    fn applied(machine: CheckoutMachine, effects: Vec<Effect>) -> Self {
        Self {
            machine,
            effects,
            disposition: Disposition::Applied,
        }
    }

    fn ignored(machine: &CheckoutMachine) -> Self {
        Self {
            machine: machine.clone(),
            effects: Vec::new(),
            disposition: Disposition::Ignored,
        }
    }
}

/// A checkout dialog: `Idle` with no session, or one live session
#[derive(Clone, Debug, Default)]
pub struct CheckoutMachine {
    session: Option<CheckoutSession>,
}

impl CheckoutMachine {
    pub const fn new() -> Self {
        Self { session: None }
    }

    pub fn state(&self) -> CheckoutState {
        self.session
            .as_ref()
            .map_or(CheckoutState::Idle, |s| s.state)
    }

    pub const fn session(&self) -> Option<&CheckoutSession> {
        self.session.as_ref()
    }

    pub fn progress(&self) -> Progress {
        self.session.as_ref().map_or(Progress::ZERO, |s| s.progress)
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.session.as_ref().and_then(|s| s.outcome.as_ref())
    }

    const fn with_session(session: CheckoutSession) -> Self {
        Self {
            session: Some(session),
        }
    }
}

/// Apply one event.
///
/// Errors are only returned for `Confirm` (validation, authentication);
/// the machine is unchanged in that case. Events that make no sense in the
/// current state are ignored rather than rejected.
pub fn reduce(
    machine: &CheckoutMachine,
    event: CheckoutEvent,
    policy: &CheckoutPolicy,
) -> Result<Transition> {
    let state = machine.state();

    let transition = match (machine.session.as_ref(), event) {
        (None, CheckoutEvent::Confirm(intent)) => {
            let CheckoutIntent {
                user,
                plan,
                cycle,
                method,
                details,
            } = *intent;
            let user = user.ok_or(CheckoutError::AuthRequired)?;
            details.validate(method)?;

            let session = CheckoutSession::confirmed(user, plan, cycle, method, details);
            Transition::applied(CheckoutMachine::with_session(session), Vec::new())
        }

        (Some(session), CheckoutEvent::Start) if session.state == CheckoutState::Submitting => {
            let mut session = session.clone();
            session.state = CheckoutState::Processing;
            session.progress = Progress::ZERO;
            Transition::applied(CheckoutMachine::with_session(session), vec![Effect::StartClock])
        }

        (Some(session), CheckoutEvent::Tick) if session.state == CheckoutState::Processing => {
            let mut session = session.clone();
            session.progress = session.progress.advance(policy.tick_step);
            Transition::applied(CheckoutMachine::with_session(session), Vec::new())
        }

        (Some(session), CheckoutEvent::Resolve { draw })
            if session.state == CheckoutState::Processing && session.outcome.is_none() =>
        {
            let mut session = session.clone();
            if policy.approves(draw) {
                session.outcome = Some(Outcome::Approved);
                let record = session.record();
                Transition::applied(
                    CheckoutMachine::with_session(session),
                    vec![Effect::Persist(record)],
                )
            } else {
                session.state = CheckoutState::Failed;
                session.outcome = Some(Outcome::Declined);
                Transition::applied(
                    CheckoutMachine::with_session(session),
                    vec![Effect::Notify(Notification::payment_declined())],
                )
            }
        }

        (Some(session), CheckoutEvent::Persisted)
            if session.state == CheckoutState::Processing
                && session.outcome == Some(Outcome::Approved) =>
        {
            let mut session = session.clone();
            session.state = CheckoutState::Succeeded;
            let notification = Notification::payment_approved(&session.plan.name);
            Transition::applied(
                CheckoutMachine::with_session(session),
                vec![
                    Effect::Notify(notification),
                    Effect::ScheduleAutoClose(policy.auto_close_after),
                ],
            )
        }

        (Some(session), CheckoutEvent::PersistFailed { reason })
            if session.state == CheckoutState::Processing
                && session.outcome == Some(Outcome::Approved) =>
        {
            let mut session = session.clone();
            session.state = CheckoutState::Failed;
            session.outcome = Some(Outcome::PersistenceFailed { reason });
            Transition::applied(
                CheckoutMachine::with_session(session),
                vec![Effect::Notify(Notification::persistence_failed())],
            )
        }

        (Some(session), CheckoutEvent::AutoClose) if session.state == CheckoutState::Succeeded => {
            Transition::applied(
                CheckoutMachine::new(),
                vec![Effect::InvokeOnSuccess, Effect::InvokeOnClose],
            )
        }

        (Some(session), CheckoutEvent::Retry) if session.state == CheckoutState::Failed => {
            Transition::applied(CheckoutMachine::new(), Vec::new())
        }

        (Some(session), CheckoutEvent::Close) => {
            let mut effects = vec![Effect::CancelClock];
            if session.state == CheckoutState::Succeeded {
                effects.push(Effect::InvokeOnSuccess);
            }
            Transition::applied(CheckoutMachine::new(), effects)
        }

        (_, event) => {
            tracing::debug!(state = %state, event = event.name(), "Ignoring checkout event");
            Transition::ignored(machine)
        }
    };

    Ok(transition)
}
