//! Pricing Page
//!
//! Billing cycle toggle, plan selection and the checkout dialog opened for
//! the selected plan. The page tracks the signed-in user itself so it can
//! turn anonymous visitors away before a dialog is mounted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use tokio::task::JoinHandle;

use checkout_core::{
    find_plan, quotes, BillingCycle, CheckoutError, DialogView, Disposition, Notification,
    PaymentDetails, PaymentMethod, Plan, PlanQuote, Result, User,
};

use crate::config::CheckoutConfig;
use crate::orchestrator::{CheckoutOrchestrator, Collaborators};
use crate::ports::{Navigator, SessionChange};

/// The dialog currently shown and the plan it was opened for
#[derive(Clone)]
struct OpenDialog {
    generation: u64,
    plan: &'static Plan,
    dialog: CheckoutOrchestrator,
}

pub struct PricingPage {
    config: CheckoutConfig,
    collaborators: Collaborators,
    navigator: Arc<dyn Navigator>,
    cycle: BillingCycle,
    user: Arc<RwLock<Option<User>>>,
    watcher: Option<JoinHandle<()>>,
    /// Cleared by the page or by the dialog dismissing itself
    open: Arc<Mutex<Option<OpenDialog>>>,
    generation: u64,
}

impl PricingPage {
    pub fn new(config: CheckoutConfig, collaborators: Collaborators, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            config,
            collaborators,
            navigator,
            cycle: BillingCycle::default(),
            user: Arc::new(RwLock::new(None)),
            watcher: None,
            open: Arc::new(Mutex::new(None)),
            generation: 0,
        }
    }

    /// Resolve the current user and follow sign-in changes
    pub async fn mount(&mut self) {
        let mut subscription = self.collaborators.identity.subscribe();
        let current = self.collaborators.identity.current_user().await;
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = current;

        let user = Arc::clone(&self.user);
        let watcher = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                let next = match change {
                    SessionChange::SignedIn(user) => Some(user),
                    SessionChange::SignedOut => None,
                };
                *user.write().unwrap_or_else(PoisonError::into_inner) = next;
            }
        });

        if let Some(previous) = self.watcher.replace(watcher) {
            previous.abort();
        }
    }

    /// Tear down the dialog and stop following sign-in changes
    pub async fn unmount(&mut self) {
        self.close_dialog().await;
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
            let _ = watcher.await;
        }
    }

    pub const fn cycle(&self) -> BillingCycle {
        self.cycle
    }

    pub fn set_cycle(&mut self, cycle: BillingCycle) {
        if self.cycle != cycle {
            tracing::debug!(cycle = %cycle, "Billing cycle changed");
        }
        self.cycle = cycle;
    }

    pub fn toggle_cycle(&mut self) -> BillingCycle {
        self.set_cycle(self.cycle.toggle());
        self.cycle
    }

    /// Every plan priced for the selected cycle
    pub fn quotes(&self) -> Vec<PlanQuote> {
        quotes(self.cycle)
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn selected_plan(&self) -> Option<&'static Plan> {
        self.current().map(|open| open.plan)
    }

    pub fn dialog(&self) -> Option<CheckoutOrchestrator> {
        self.current().map(|open| open.dialog)
    }

    fn lock_open(&self) -> MutexGuard<'_, Option<OpenDialog>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> Option<OpenDialog> {
        self.lock_open().clone()
    }

    /// Open the checkout dialog for a plan.
    ///
    /// Anonymous visitors get a login toast and are sent to the auth page
    /// instead.
    pub async fn select_plan(&mut self, name: &str) -> Result<CheckoutOrchestrator> {
        let plan = find_plan(name).ok_or_else(|| CheckoutError::UnknownPlan(name.to_string()))?;

        if self.user().is_none() {
            tracing::info!(plan = %plan.name, "Plan selected without a signed-in user");
            self.collaborators.notifier.notify(Notification::login_required());
            self.navigator.redirect(&self.config.auth_path);
            return Err(CheckoutError::AuthRequired);
        }

        self.close_dialog().await;

        self.generation += 1;
        let dialog = CheckoutOrchestrator::new(
            self.config.clone(),
            self.collaborators.clone(),
            self.success_callback(),
            self.dismiss_callback(self.generation),
        );
        dialog.mount().await;

        tracing::info!(plan = %plan.name, cycle = %self.cycle, "Opened checkout");
        *self.lock_open() = Some(OpenDialog {
            generation: self.generation,
            plan,
            dialog: dialog.clone(),
        });
        Ok(dialog)
    }

    /// Confirm the open dialog at the current cycle's price and start
    /// processing
    pub fn confirm_payment(&self, method: PaymentMethod, details: PaymentDetails) -> Result<Disposition> {
        let Some(OpenDialog { plan, dialog, .. }) = self.current() else {
            return Err(CheckoutError::SessionNotFound("no checkout dialog is open".into()));
        };

        let confirmed = dialog.confirm(plan, self.cycle, method, details)?;
        if confirmed == Disposition::Ignored {
            return Ok(confirmed);
        }
        dialog.start()
    }

    /// Close and unmount the dialog, if one is open
    pub async fn close_dialog(&mut self) {
        let open = self.lock_open().take();
        if let Some(open) = open {
            open.dialog.unmount().await;
        }
    }

    pub fn view(&self) -> Option<DialogView> {
        let open = self.current()?;
        Some(open.dialog.view(Some((open.plan, self.cycle))))
    }

    fn success_callback(&self) -> impl Fn() + Send + Sync + 'static {
        let notifier = Arc::clone(&self.collaborators.notifier);
        let navigator = Arc::clone(&self.navigator);
        let home = self.config.home_path.clone();
        let delay = self.config.redirect_delay;

        move || {
            notifier.notify(Notification::subscription_activated());

            let navigator = Arc::clone(&navigator);
            let home = home.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        tokio::time::sleep(delay).await;
                        navigator.redirect(&home);
                    });
                }
                Err(_) => navigator.redirect(&home),
            }
        }
    }

    /// Drops the dialog of `generation` once it closes itself. Holds the
    /// slot weakly so the dialog does not keep itself alive.
    fn dismiss_callback(&self, generation: u64) -> impl Fn() + Send + Sync + 'static {
        let slot: Weak<Mutex<Option<OpenDialog>>> = Arc::downgrade(&self.open);

        move || {
            let Some(slot) = slot.upgrade() else { return };
            let closed = {
                let mut open = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if open.as_ref().is_some_and(|o| o.generation == generation) {
                    open.take()
                } else {
                    None
                }
            };
            let Some(closed) = closed else { return };

            tracing::info!(plan = %closed.plan.name, "Checkout dialog dismissed");
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move { closed.dialog.unmount().await });
                }
                Err(_) => {
                    closed.dialog.close();
                }
            }
        }
    }
}

impl Drop for PricingPage {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        let open = self.lock_open().take();
        if let Some(open) = open {
            open.dialog.close();
        }
    }
}
