//! Checkout Orchestrator
//!
//! Owns one checkout dialog: the machine, the processing clock and the
//! collaborators the reducer's effects are carried out against.
//!
//! Every spawned task (clock, store write, auto-close timer) is tagged with
//! the epoch it was started in. Ending a session bumps the epoch, so events
//! from a closed session are dropped even if they race the abort.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use checkout_core::{
    reduce, BillingCycle, CheckoutError, CheckoutEvent, CheckoutIntent, CheckoutMachine,
    CheckoutPolicy, CheckoutSession, CheckoutState, ClockEvent, DialogView, Disposition, Effect,
    Notification, PaymentDetails, PaymentMethod, Plan, Progress, Result, SubscriptionRecord,
    Transition, User,
};

use crate::config::CheckoutConfig;
use crate::ports::{
    IdentityProvider, NotificationSink, RandomSource, SessionChange, SessionSubscription,
    SubscriptionStore,
};
use crate::reporter::{ProgressReporter, SessionSnapshot};

/// Services a dialog talks to
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn SubscriptionStore>,
    pub notifier: Arc<dyn NotificationSink>,
    pub random: Arc<dyn RandomSource>,
}

type Callback = Box<dyn Fn() + Send + Sync>;

/// Drives one checkout dialog.
///
/// Must be used from within a tokio runtime: starting a checkout spawns the
/// processing clock.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: CheckoutConfig,
    policy: CheckoutPolicy,
    collaborators: Collaborators,
    on_success: Callback,
    on_close: Callback,
    reporter: ProgressReporter,
    shared: Mutex<Shared>,
}

#[derive(Default)]
struct Shared {
    machine: CheckoutMachine,
    /// Bumped whenever a session ends
    epoch: u64,
    /// Bumped on unmount
    lifecycle: u64,
    user: Option<User>,
    /// The one in-flight task of the current session
    task: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl CheckoutOrchestrator {
    /// Create an unmounted dialog. `on_success` runs once per successful
    /// checkout, when the dialog closes. `on_close` runs when the dialog
    /// dismisses itself after a success; the host should drop and unmount it.
    pub fn new(
        config: CheckoutConfig,
        collaborators: Collaborators,
        on_success: impl Fn() + Send + Sync + 'static,
        on_close: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let policy = config.policy();
        Self {
            inner: Arc::new(Inner {
                config,
                policy,
                collaborators,
                on_success: Box::new(on_success),
                on_close: Box::new(on_close),
                reporter: ProgressReporter::new(),
                shared: Mutex::new(Shared::default()),
            }),
        }
    }

    /// Subscribe to session changes and fetch the current user
    pub async fn mount(&self) {
        let lifecycle = self.inner.lock().lifecycle;
        let subscription = self.inner.collaborators.identity.subscribe();
        let user = self.inner.collaborators.identity.current_user().await;

        let mut shared = self.inner.lock();
        if shared.lifecycle != lifecycle {
            tracing::debug!("Dialog unmounted before identity resolved");
            return;
        }
        shared.user = user;
        let watcher = self.inner.spawn_watcher(subscription);
        if let Some(previous) = shared.watcher.replace(watcher) {
            previous.abort();
        }
    }

    /// Close any session and drop the session-change subscription
    pub async fn unmount(&self) {
        self.close();

        let watcher = {
            let mut shared = self.inner.lock();
            shared.lifecycle += 1;
            shared.user = None;
            shared.watcher.take()
        };

        if let Some(watcher) = watcher {
            watcher.abort();
            // Resolves once the task, and its subscription, are dropped
            let _ = watcher.await;
        }
    }

    /// Capture the plan, price and payment details. Card payments with blank
    /// card fields are rejected and reported through the notification sink.
    pub fn confirm(
        &self,
        plan: &Plan,
        cycle: BillingCycle,
        method: PaymentMethod,
        details: PaymentDetails,
    ) -> Result<Disposition> {
        let user = self.inner.lock().user.as_ref().map(|u| u.id.clone());
        let intent = CheckoutIntent {
            user,
            plan: plan.clone(),
            cycle,
            method,
            details,
        };

        let result = self
            .inner
            .dispatch(None, CheckoutEvent::Confirm(Box::new(intent)));

        if let Err(err @ CheckoutError::Validation { .. }) = &result {
            tracing::warn!(plan = %plan.name, error = %err, "Rejected checkout");
            self.inner
                .collaborators
                .notifier
                .notify(Notification::for_error(err));
        }
        result
    }

    /// Begin simulated processing
    pub fn start(&self) -> Result<Disposition> {
        self.inner.dispatch(None, CheckoutEvent::Start)
    }

    /// Reset a failed session
    pub fn retry(&self) -> Result<Disposition> {
        self.inner.dispatch(None, CheckoutEvent::Retry)
    }

    /// Close the dialog, cancelling anything in flight
    pub fn close(&self) -> Disposition {
        self.inner
            .dispatch(None, CheckoutEvent::Close)
            .unwrap_or(Disposition::Ignored)
    }

    pub fn state(&self) -> CheckoutState {
        self.inner.lock().machine.state()
    }

    pub fn progress(&self) -> Progress {
        self.inner.lock().machine.progress()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.lock().user.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.reporter.current()
    }

    /// Follow snapshots as they are published
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.reporter.subscribe()
    }

    /// Read the live session without copying it out
    pub fn with_session<R>(&self, f: impl FnOnce(Option<&CheckoutSession>) -> R) -> R {
        f(self.inner.lock().machine.session())
    }

    pub fn view(&self, staged: Option<(&Plan, BillingCycle)>) -> DialogView {
        DialogView::render(&self.inner.lock().machine, staged)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reduce one event and run its effects.
    ///
    /// `expected_epoch` is set for events produced by background tasks; a
    /// mismatch means their session is gone.
    fn dispatch(self: &Arc<Self>, expected_epoch: Option<u64>, event: CheckoutEvent) -> Result<Disposition> {
        let event_name = event.name();

        let deferred = {
            let mut shared = self.lock();

            if expected_epoch.is_some_and(|epoch| epoch != shared.epoch) {
                tracing::debug!(event = event_name, "Discarding event from a closed session");
                return Ok(Disposition::Ignored);
            }

            let Transition {
                machine,
                effects,
                disposition,
            } = reduce(&shared.machine, event, &self.policy)?;

            if disposition == Disposition::Ignored {
                return Ok(disposition);
            }

            let from = shared.machine.state();
            let to = machine.state();
            let session_id = shared
                .machine
                .session()
                .or_else(|| machine.session())
                .map(|s| s.id.to_string())
                .unwrap_or_default();

            if from == to {
                tracing::debug!(
                    session_id = %session_id,
                    state = %to,
                    progress = machine.progress().value(),
                    event = event_name,
                    "Checkout updated"
                );
            } else {
                tracing::info!(
                    session_id = %session_id,
                    from = %from,
                    to = %to,
                    event = event_name,
                    "Checkout transition"
                );
            }

            let ended = shared.machine.session().is_some() && machine.session().is_none();
            shared.machine = machine;
            if ended {
                shared.epoch += 1;
            }
            self.reporter
                .publish(SessionSnapshot::of(&shared.machine, shared.epoch));

            let epoch = shared.epoch;
            let mut deferred = Vec::new();
            for effect in effects {
                match effect {
                    Effect::StartClock => {
                        let clock = self.spawn_clock(epoch);
                        Self::replace_task(&mut shared, clock);
                    }
                    Effect::Persist(record) => {
                        let write = self.spawn_persist(record, epoch);
                        Self::replace_task(&mut shared, write);
                    }
                    Effect::ScheduleAutoClose(delay) => {
                        let timer = self.spawn_timer(delay, epoch, CheckoutEvent::AutoClose);
                        Self::replace_task(&mut shared, timer);
                    }
                    Effect::CancelClock => {
                        if let Some(task) = shared.task.take() {
                            task.abort();
                        }
                    }
                    other => deferred.push(other),
                }
            }
            deferred
        };

        // Outside the lock: callbacks may re-enter the orchestrator
        for effect in deferred {
            match effect {
                Effect::Notify(notification) => self.collaborators.notifier.notify(notification),
                Effect::InvokeOnSuccess => (self.on_success)(),
                Effect::InvokeOnClose => (self.on_close)(),
                _ => {}
            }
        }

        Ok(Disposition::Applied)
    }

    /// Phases hand over sequentially, so the previous task has already run
    /// its last step; dropping its handle detaches it.
    fn replace_task(shared: &mut Shared, task: JoinHandle<()>) {
        shared.task = Some(task);
    }

    fn spawn_clock(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let events = self.config.schedule().events();

        tokio::spawn(async move {
            let started = Instant::now();
            for (offset, event) in events {
                tokio::time::sleep_until(started + offset).await;

                let Some(inner) = weak.upgrade() else { return };
                let event = match event {
                    ClockEvent::Tick => CheckoutEvent::Tick,
                    ClockEvent::Resolve => CheckoutEvent::Resolve {
                        draw: inner.collaborators.random.draw(),
                    },
                };
                if let Err(err) = inner.dispatch(Some(epoch), event) {
                    tracing::warn!(error = %err, "Clock event rejected");
                }
            }
        })
    }

    fn spawn_persist(self: &Arc<Self>, record: SubscriptionRecord, epoch: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let store = Arc::clone(&self.collaborators.store);

        tokio::spawn(async move {
            let result = store.insert(record).await;

            let Some(inner) = weak.upgrade() else { return };
            let event = match result {
                Ok(()) => CheckoutEvent::Persisted,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to store subscription after approved payment");
                    CheckoutEvent::PersistFailed {
                        reason: err.to_string(),
                    }
                }
            };
            if let Err(err) = inner.dispatch(Some(epoch), event) {
                tracing::warn!(error = %err, "Store result rejected");
            }
        })
    }

    fn spawn_timer(self: &Arc<Self>, delay: Duration, epoch: u64, event: CheckoutEvent) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                if let Err(err) = inner.dispatch(Some(epoch), event) {
                    tracing::warn!(error = %err, "Timer event rejected");
                }
            }
        })
    }

    fn spawn_watcher(self: &Arc<Self>, mut subscription: SessionSubscription) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                let Some(inner) = weak.upgrade() else { return };
                inner.on_session_change(change);
            }
        })
    }

    fn on_session_change(self: &Arc<Self>, change: SessionChange) {
        match change {
            SessionChange::SignedIn(user) => {
                tracing::debug!(user_id = %user.id, "Dialog user changed");
                self.lock().user = Some(user);
            }
            SessionChange::SignedOut => {
                self.lock().user = None;
                if self.dispatch(None, CheckoutEvent::Close) == Ok(Disposition::Applied) {
                    tracing::info!("Closed checkout after sign-out");
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let shared = self.shared.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = shared.task.take() {
            task.abort();
        }
        if let Some(watcher) = shared.watcher.take() {
            watcher.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use checkout_core::{find_plan, Outcome};
    use rust_decimal_macros::dec;

    use crate::memory::{MemoryIdentityProvider, MemoryNotificationSink, MemorySubscriptionStore};
    use crate::random::FixedRandom;

    struct Harness {
        dialog: CheckoutOrchestrator,
        identity: Arc<MemoryIdentityProvider>,
        store: Arc<MemorySubscriptionStore>,
        sink: Arc<MemoryNotificationSink>,
        successes: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    async fn harness(random: FixedRandom) -> Harness {
        let identity = Arc::new(MemoryIdentityProvider::signed_in("ana@example.com"));
        let store = Arc::new(MemorySubscriptionStore::new());
        let sink = Arc::new(MemoryNotificationSink::new());
        let successes = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&successes);
        let close_counter = Arc::clone(&closes);
        let dialog = CheckoutOrchestrator::new(
            CheckoutConfig::default(),
            Collaborators {
                identity: identity.clone(),
                store: store.clone(),
                notifier: sink.clone(),
                random: Arc::new(random),
            },
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                close_counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        dialog.mount().await;

        Harness {
            dialog,
            identity,
            store,
            sink,
            successes,
            closes,
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn checkout_pix(h: &Harness) {
        let plan = find_plan("Professional").unwrap();
        let confirmed = h
            .dialog
            .confirm(plan, BillingCycle::Annual, PaymentMethod::Pix, PaymentDetails::default())
            .unwrap();
        assert_eq!(confirmed, Disposition::Applied);
        assert_eq!(h.dialog.state(), CheckoutState::Submitting);
        assert_eq!(h.dialog.start().unwrap(), Disposition::Applied);
        assert_eq!(h.dialog.state(), CheckoutState::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_professional_annual_pix_succeeds() {
        let h = harness(FixedRandom::approving()).await;
        checkout_pix(&h);

        // Sample halfway between ticks
        sleep_ms(100).await;
        let mut seen = vec![h.dialog.progress().value()];
        for _ in 0..10 {
            sleep_ms(200).await;
            seen.push(h.dialog.progress().value());
        }
        assert_eq!(seen, [0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert_eq!(h.dialog.state(), CheckoutState::Processing);

        // Resolution at 2500ms
        sleep_ms(500).await;
        assert_eq!(h.dialog.state(), CheckoutState::Succeeded);

        let records = h.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plan_name, "Professional");
        assert_eq!(records[0].plan_price, dec!(790));
        assert_eq!(records[0].payment_method, "Pix");
        assert_eq!(records[0].user_id, h.identity.user().unwrap().id);

        assert_eq!(
            h.sink.notifications(),
            vec![Notification::payment_approved("Professional")]
        );
        assert_eq!(h.successes.load(Ordering::SeqCst), 0);

        // Auto-close 2s after success
        assert_eq!(h.closes.load(Ordering::SeqCst), 0);
        sleep_ms(2000).await;
        assert_eq!(h.dialog.state(), CheckoutState::Idle);
        assert_eq!(h.successes.load(Ordering::SeqCst), 1);
        assert_eq!(h.closes.load(Ordering::SeqCst), 1);

        sleep_ms(5000).await;
        assert_eq!(h.successes.load(Ordering::SeqCst), 1);
        assert_eq!(h.closes.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.insert_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_declining_draw_fails_without_write() {
        let h = harness(FixedRandom::declining()).await;
        checkout_pix(&h);

        sleep_ms(2600).await;
        assert_eq!(h.dialog.state(), CheckoutState::Failed);
        assert_eq!(h.dialog.snapshot().outcome, Some(Outcome::Declined));
        assert_eq!(h.store.insert_attempts(), 0);
        assert_eq!(h.sink.notifications(), vec![Notification::payment_declined()]);

        assert_eq!(h.dialog.retry().unwrap(), Disposition::Applied);
        assert_eq!(h.dialog.state(), CheckoutState::Idle);
        assert!(h.dialog.with_session(|s| s.is_none()));

        sleep_ms(5000).await;
        assert_eq!(h.store.insert_attempts(), 0);
        assert_eq!(h.successes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_and_start_ignored_while_processing() {
        let h = harness(FixedRandom::approving()).await;
        checkout_pix(&h);

        sleep_ms(500).await;
        assert_eq!(h.dialog.progress().value(), 20);

        let starter = find_plan("Starter").unwrap();
        let again = h
            .dialog
            .confirm(starter, BillingCycle::Monthly, PaymentMethod::Pix, PaymentDetails::default())
            .unwrap();
        assert_eq!(again, Disposition::Ignored);
        assert_eq!(h.dialog.start().unwrap(), Disposition::Ignored);

        assert_eq!(h.dialog.state(), CheckoutState::Processing);
        assert_eq!(h.dialog.progress().value(), 20);
        assert_eq!(h.dialog.with_session(|s| s.unwrap().price), dec!(790));

        sleep_ms(2100).await;
        assert_eq!(h.store.insert_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_mid_processing_cancels_everything() {
        let h = harness(FixedRandom::approving()).await;
        checkout_pix(&h);
        let mut snapshots = h.dialog.subscribe();

        sleep_ms(1100).await;
        assert_eq!(h.dialog.close(), Disposition::Applied);
        assert_eq!(h.dialog.state(), CheckoutState::Idle);
        snapshots.mark_unchanged();

        sleep_ms(10_000).await;
        assert_eq!(h.dialog.state(), CheckoutState::Idle);
        assert_eq!(h.dialog.progress(), Progress::ZERO);
        assert!(!snapshots.has_changed().unwrap());
        assert_eq!(h.store.insert_attempts(), 0);
        assert!(h.sink.notifications().is_empty());
        assert_eq!(h.successes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_reports_persistence_error() {
        let h = harness(FixedRandom::approving()).await;
        h.store.set_failing(true);
        checkout_pix(&h);

        sleep_ms(2600).await;
        assert_eq!(h.dialog.state(), CheckoutState::Failed);
        assert!(matches!(
            h.dialog.snapshot().outcome,
            Some(Outcome::PersistenceFailed { .. })
        ));
        assert_eq!(h.store.insert_attempts(), 1);
        assert_eq!(h.sink.notifications(), vec![Notification::persistence_failed()]);

        let view = h.dialog.view(None);
        assert!(view.can_retry);
        assert!(!view.description.contains("declined"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_closes_dialog() {
        let h = harness(FixedRandom::approving()).await;
        checkout_pix(&h);

        sleep_ms(700).await;
        h.identity.sign_out();

        sleep_ms(5000).await;
        assert_eq!(h.dialog.state(), CheckoutState::Idle);
        assert!(h.dialog.user().is_none());
        assert_eq!(h.store.insert_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_unsubscribes() {
        let h = harness(FixedRandom::approving()).await;
        assert_eq!(h.identity.subscriber_count(), 1);
        checkout_pix(&h);

        h.dialog.unmount().await;
        assert_eq!(h.identity.subscriber_count(), 0);

        sleep_ms(5000).await;
        assert_eq!(h.dialog.state(), CheckoutState::Idle);
        assert_eq!(h.store.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_card_without_details_is_rejected() {
        let h = harness(FixedRandom::approving()).await;
        let plan = find_plan("Starter").unwrap();

        let err = h
            .dialog
            .confirm(plan, BillingCycle::Monthly, PaymentMethod::Card, PaymentDetails::default())
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation { .. }));
        assert_eq!(h.dialog.state(), CheckoutState::Idle);

        let sent = h.sink.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Missing payment details");

        let card = PaymentDetails::card("4242 4242 4242 4242", "12/30", "123");
        assert!(h
            .dialog
            .confirm(plan, BillingCycle::Monthly, PaymentMethod::Card, card)
            .is_ok());
    }

    #[tokio::test]
    async fn test_confirm_without_user() {
        let h = harness(FixedRandom::approving()).await;
        h.dialog.unmount().await;
        h.identity.sign_out();

        let plan = find_plan("Starter").unwrap();
        let err = h
            .dialog
            .confirm(plan, BillingCycle::Monthly, PaymentMethod::Pix, PaymentDetails::default())
            .unwrap_err();
        assert_eq!(err, CheckoutError::AuthRequired);
        assert_eq!(h.dialog.state(), CheckoutState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_close_after_success_invokes_callback_once() {
        let h = harness(FixedRandom::approving()).await;
        checkout_pix(&h);

        sleep_ms(2600).await;
        assert_eq!(h.dialog.state(), CheckoutState::Succeeded);
        h.dialog.close();
        assert_eq!(h.successes.load(Ordering::SeqCst), 1);

        sleep_ms(5000).await;
        assert_eq!(h.successes.load(Ordering::SeqCst), 1);
        // The host closed it; no dismissal request
        assert_eq!(h.closes.load(Ordering::SeqCst), 0);
    }
}
