//! Progress Reporter
//!
//! Publishes a snapshot after every applied transition so views can follow
//! the progress bar without touching the session.

use serde::Serialize;
use tokio::sync::watch;

use checkout_core::{CheckoutMachine, CheckoutState, Outcome};

/// Point-in-time view of a dialog
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Bumped each time a session ends
    pub epoch: u64,
    pub state: CheckoutState,
    pub progress: u8,
    pub outcome: Option<Outcome>,
}

impl SessionSnapshot {
    pub fn of(machine: &CheckoutMachine, epoch: u64) -> Self {
        Self {
            epoch,
            state: machine.state(),
            progress: machine.progress().value(),
            outcome: machine.outcome().cloned(),
        }
    }
}

/// Fan-out of dialog snapshots
pub struct ProgressReporter {
    sender: watch::Sender<SessionSnapshot>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SessionSnapshot::default());
        Self { sender }
    }

    pub fn publish(&self, snapshot: SessionSnapshot) {
        self.sender.send_replace(snapshot);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> SessionSnapshot {
        self.sender.borrow().clone()
    }
}
