//! API Client

use serde::{Deserialize, Serialize};

use checkout_core::{BillingCycle, DialogView, Notification, PaymentDetails, PaymentMethod, User};

const TOKEN_KEY: &str = "checkout.token";
const AUTH_PATH: &str = "/auth";

/// Why a request did not go through
#[derive(Clone, Debug)]
pub enum ApiFailure {
    /// No valid session; send the user to sign in
    AuthRequired,
    Rejected(String),
    Network(String),
}

impl ApiFailure {
    pub fn message(&self) -> String {
        match self {
            Self::AuthRequired => "Sign in to subscribe to a plan.".into(),
            Self::Rejected(message) => message.clone(),
            Self::Network(e) => format!("Could not reach the server: {e}"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutStarted {
    pub view: Option<DialogView>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutStatus {
    pub view: Option<DialogView>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    pub redirect: Option<String>,
}

#[derive(Serialize)]
struct CheckoutRequest<'a> {
    plan: &'a str,
    cycle: BillingCycle,
    payment_method: PaymentMethod,
    details: &'a PaymentDetails,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

// ============================================================================
// Browser helpers
// ============================================================================

fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into())
}

fn url(path: &str) -> String {
    format!("{}{path}", origin())
}

fn storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// Bearer token of the signed-in demo user
pub fn token() -> Option<String> {
    storage()?.get_item(TOKEN_KEY).ok()?
}

fn store_token(token: &str) {
    if let Some(storage) = storage() {
        let _ = storage.set_item(TOKEN_KEY, token);
    }
}

fn clear_token() {
    if let Some(storage) = storage() {
        let _ = storage.remove_item(TOKEN_KEY);
    }
}

/// Full page navigation
pub fn redirect(path: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.location().set_href(path);
    }
}

fn authorized(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match token() {
        Some(token) => request.header("Authorization", format!("Bearer {token}")),
        None => request,
    }
}

async fn failure(response: reqwest::Response) -> ApiFailure {
    let status = response.status();
    // fetch follows the 303, so the redirect shows up as the final URL
    if status == reqwest::StatusCode::UNAUTHORIZED || response.url().path() == AUTH_PATH {
        clear_token();
        return ApiFailure::AuthRequired;
    }

    match response.json::<ErrorBody>().await {
        Ok(body) => ApiFailure::Rejected(body.error),
        Err(_) => ApiFailure::Rejected(format!("Request failed ({status})")),
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Demo sign-in; stores the token for later requests
pub async fn sign_in(email: &str) -> Result<User, ApiFailure> {
    let response = reqwest::Client::new()
        .post(url("/api/session"))
        .json(&serde_json::json!({ "email": email }))
        .send()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failure(response).await);
    }

    let session: SessionResponse = response
        .json()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))?;
    store_token(&session.token);
    Ok(session.user)
}

pub async fn sign_out() {
    let _ = authorized(reqwest::Client::new().delete(url("/api/session")))
        .send()
        .await;
    clear_token();
}

/// Open, confirm and start a checkout
pub async fn start_checkout(
    plan: &str,
    cycle: BillingCycle,
    payment_method: PaymentMethod,
    details: &PaymentDetails,
) -> Result<CheckoutStarted, ApiFailure> {
    let body = CheckoutRequest {
        plan,
        cycle,
        payment_method,
        details,
    };

    let response = authorized(reqwest::Client::new().post(url("/api/checkout")))
        .json(&body)
        .send()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))?;

    if !response.status().is_success() || response.url().path() == AUTH_PATH {
        return Err(failure(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))
}

/// Current dialog view, pending toasts and redirect
pub async fn poll_checkout() -> Result<CheckoutStatus, ApiFailure> {
    let response = authorized(reqwest::Client::new().get(url("/api/checkout")))
        .send()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failure(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))
}

pub async fn retry_checkout() -> Result<DialogView, ApiFailure> {
    let response = authorized(reqwest::Client::new().post(url("/api/checkout/retry")))
        .send()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failure(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| ApiFailure::Network(e.to_string()))
}

pub async fn close_checkout() {
    let _ = authorized(reqwest::Client::new().delete(url("/api/checkout")))
        .send()
        .await;
}
