//! Application State

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use checkout_core::User;
use checkout_runtime::{
    CheckoutConfig, Collaborators, MemoryIdentityProvider, MemoryNavigator,
    MemoryNotificationSink, MemorySubscriptionStore, PricingPage, RandomSource,
};

/// One signed-in browser session
pub struct Client {
    pub identity: Arc<MemoryIdentityProvider>,
    pub notifications: Arc<MemoryNotificationSink>,
    pub navigator: Arc<MemoryNavigator>,
    pub page: Mutex<PricingPage>,
}

impl Client {
    pub fn user(&self) -> Option<User> {
        self.identity.user()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CheckoutConfig>,

    /// Subscription records for every client
    pub store: Arc<MemorySubscriptionStore>,

    /// Draws for the simulated charge
    pub random: Arc<dyn RandomSource>,

    /// Clients by bearer token
    clients: Arc<RwLock<HashMap<String, Arc<Client>>>>,
}

impl AppState {
    pub fn new(config: CheckoutConfig, random: Arc<dyn RandomSource>) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(MemorySubscriptionStore::new()),
            random,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Sign `email` in as a fresh client and return its token
    pub async fn sign_in(&self, email: &str) -> (String, User) {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let user = identity.sign_in(email);
        let notifications = Arc::new(MemoryNotificationSink::new());
        let navigator = Arc::new(MemoryNavigator::new());

        let mut page = PricingPage::new(
            (*self.config).clone(),
            Collaborators {
                identity: identity.clone(),
                store: self.store.clone(),
                notifier: notifications.clone(),
                random: self.random.clone(),
            },
            navigator.clone(),
        );
        page.mount().await;

        let token = uuid::Uuid::new_v4().to_string();
        let client = Arc::new(Client {
            identity,
            notifications,
            navigator,
            page: Mutex::new(page),
        });
        self.clients.write().await.insert(token.clone(), client);

        (token, user)
    }

    pub async fn client(&self, token: &str) -> Option<Arc<Client>> {
        self.clients.read().await.get(token).cloned()
    }

    /// Sign the client out, closing any open dialog
    pub async fn sign_out(&self, token: &str) -> bool {
        let Some(client) = self.clients.write().await.remove(token) else {
            return false;
        };
        client.identity.sign_out();
        client.page.lock().await.unmount().await;
        true
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}
