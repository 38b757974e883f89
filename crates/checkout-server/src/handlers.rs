//! HTTP Handlers

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use checkout_core::{
    list_plans, quotes, BillingCycle, CheckoutError, DialogView, Disposition, Notification,
    PaymentDetails, PaymentMethod, Plan, PlanQuote, SubscriptionRecord, User,
};
use checkout_runtime::SessionSnapshot;

use crate::state::{AppState, Client};

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub clients: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PlansQuery {
    #[serde(default)]
    pub cycle: Option<String>,
}

#[derive(Serialize)]
pub struct PlanEntry {
    #[serde(flatten)]
    pub quote: PlanQuote,
    pub call_to_action: &'static str,
    pub annual_savings: Decimal,
}

#[derive(Serialize)]
pub struct PlansResponse {
    pub cycle: BillingCycle,
    /// Best annual discount across the catalog
    pub savings_percent: Decimal,
    pub plans: Vec<PlanEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: String,
    #[serde(default)]
    pub cycle: BillingCycle,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub details: PaymentDetails,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: Option<String>,
    pub view: Option<DialogView>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutStatus {
    pub view: Option<DialogView>,
    pub snapshot: Option<SessionSnapshot>,
    pub notifications: Vec<Notification>,
    pub redirect: Option<String>,
}

// ============================================================================
// Routing
// ============================================================================

/// API routes, without static files or middleware
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/plans", get(list_plans_handler))
        .route("/api/session", post(sign_in).delete(sign_out))
        .route(
            "/api/checkout",
            post(create_checkout).get(checkout_status).delete(close_checkout),
        )
        .route("/api/checkout/retry", post(retry_checkout))
        .route("/api/subscriptions", get(list_subscriptions))
}

// ============================================================================
// Helpers
// ============================================================================

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.into(),
        }),
    )
}

fn checkout_error(err: &CheckoutError) -> ApiError {
    let (status, code) = match err {
        CheckoutError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        CheckoutError::Declined => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_DECLINED"),
        CheckoutError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
        CheckoutError::AuthRequired => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED"),
        CheckoutError::UnknownPlan(_) => (StatusCode::NOT_FOUND, "UNKNOWN_PLAN"),
        CheckoutError::InvalidCycle(_) | CheckoutError::InvalidPaymentMethod(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
        }
        CheckoutError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
        CheckoutError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
    };
    error(status, code, err.user_message())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Option<Arc<Client>> {
    state.client(bearer(headers)?).await
}

async fn require_client(state: &AppState, headers: &HeaderMap) -> Result<Arc<Client>, ApiError> {
    authenticate(state, headers)
        .await
        .ok_or_else(|| checkout_error(&CheckoutError::AuthRequired))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        clients: state.client_count().await,
    })
}

/// Plan quotes for a billing cycle
pub async fn list_plans_handler(Query(query): Query<PlansQuery>) -> Result<Json<PlansResponse>, ApiError> {
    let cycle = match query.cycle.as_deref() {
        Some(raw) => raw.parse::<BillingCycle>().map_err(|e| checkout_error(&e))?,
        None => BillingCycle::default(),
    };

    let plans = quotes(cycle)
        .into_iter()
        .map(|quote| PlanEntry {
            call_to_action: quote.plan.call_to_action(),
            annual_savings: quote.plan.annual_savings(),
            quote,
        })
        .collect();

    let savings_percent = list_plans()
        .iter()
        .map(Plan::annual_savings_percent)
        .max()
        .unwrap_or_default();

    Ok(Json(PlansResponse {
        cycle,
        savings_percent,
        plans,
    }))
}

/// Demo sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(error(StatusCode::BAD_REQUEST, "INVALID_EMAIL", "Enter a valid email address."));
    }

    let (token, user) = state.sign_in(email).await;
    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

/// Sign out the bearer token
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let token = bearer(&headers).ok_or_else(|| checkout_error(&CheckoutError::AuthRequired))?;
    if state.sign_out(token).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(checkout_error(&CheckoutError::AuthRequired))
    }
}

/// Open the checkout dialog for a plan, confirm and start processing
pub async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Response, ApiError> {
    let Some(client) = authenticate(&state, &headers).await else {
        tracing::info!(plan = %payload.plan, "Checkout without a session, redirecting");
        return Ok(Redirect::to(&state.config.auth_path).into_response());
    };

    let mut page = client.page.lock().await;
    page.set_cycle(payload.cycle);

    let dialog = match page.select_plan(&payload.plan).await {
        Ok(dialog) => dialog,
        Err(CheckoutError::AuthRequired) => {
            return Ok(Redirect::to(&state.config.auth_path).into_response());
        }
        Err(err) => return Err(checkout_error(&err)),
    };

    page.confirm_payment(payload.payment_method, payload.details)
        .map_err(|e| checkout_error(&e))?;

    let session_id = dialog.with_session(|s| s.map(|s| s.id.to_string()));
    let response = CheckoutResponse {
        session_id,
        view: page.view(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Dialog view plus pending toasts and redirect
pub async fn checkout_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CheckoutStatus>, ApiError> {
    let client = require_client(&state, &headers).await?;
    let page = client.page.lock().await;

    Ok(Json(CheckoutStatus {
        view: page.view(),
        snapshot: page.dialog().map(|d| d.snapshot()),
        notifications: client.notifications.drain(),
        redirect: client.navigator.take_last(),
    }))
}

/// Reset a failed checkout
pub async fn retry_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DialogView>, ApiError> {
    let client = require_client(&state, &headers).await?;
    let page = client.page.lock().await;

    let dialog = page
        .dialog()
        .ok_or_else(|| checkout_error(&CheckoutError::SessionNotFound("no dialog open".into())))?;

    match dialog.retry().map_err(|e| checkout_error(&e))? {
        Disposition::Applied => page
            .view()
            .map(Json)
            .ok_or_else(|| checkout_error(&CheckoutError::SessionNotFound("no dialog open".into()))),
        Disposition::Ignored => Err(error(
            StatusCode::CONFLICT,
            "NOT_RETRYABLE",
            "Only a failed payment can be retried.",
        )),
    }
}

/// Close the dialog
pub async fn close_checkout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let client = require_client(&state, &headers).await?;
    client.page.lock().await.close_dialog().await;
    Ok(StatusCode::NO_CONTENT)
}

/// Stored subscriptions for the bearer's user
pub async fn list_subscriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SubscriptionRecord>>, ApiError> {
    let client = require_client(&state, &headers).await?;
    let user = client
        .user()
        .ok_or_else(|| checkout_error(&CheckoutError::AuthRequired))?;
    Ok(Json(state.store.records_for(&user.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use checkout_runtime::{CheckoutConfig, FixedRandom};

    fn app_with(random: FixedRandom) -> (Router, AppState) {
        let state = AppState::new(CheckoutConfig::default(), Arc::new(random));
        (api_router().with_state(state.clone()), state)
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    async fn sign_in_as(app: &Router, email: &str) -> String {
        let (status, _, body) = send(app, "POST", "/api/session", None, Some(json!({ "email": email }))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with(FixedRandom::approving());
        let (status, _, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["clients"], 0);
    }

    #[tokio::test]
    async fn test_plans_for_cycle() {
        let (app, _) = app_with(FixedRandom::approving());

        let (status, _, body) = send(&app, "GET", "/api/plans?cycle=annual", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cycle"], "annual");
        assert_eq!(body["savings_percent"], "17");
        assert_eq!(body["plans"][1]["plan"]["name"], "Professional");
        assert_eq!(body["plans"][1]["price"], "790");
        assert_eq!(body["plans"][1]["period"], "year");
        assert_eq!(body["plans"][0]["call_to_action"], "Start Free");

        let (status, _, body) = send(&app, "GET", "/api/plans", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plans"][1]["price"], "79");

        let (status, _, body) = send(&app, "GET", "/api/plans?cycle=weekly", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_checkout_without_session_redirects() {
        let (app, state) = app_with(FixedRandom::approving());
        let (status, headers, _) = send(
            &app,
            "POST",
            "/api/checkout",
            Some("not-a-token"),
            Some(json!({ "plan": "Professional", "payment_method": "pix" })),
        )
        .await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/auth");
        assert_eq!(state.store.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_email() {
        let (app, _) = app_with(FixedRandom::approving());
        let (status, _, body) = send(&app, "POST", "/api/session", None, Some(json!({ "email": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_EMAIL");
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_success_flow() {
        let (app, state) = app_with(FixedRandom::approving());
        let token = sign_in_as(&app, "ana@example.com").await;

        let (status, _, body) = send(
            &app,
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({ "plan": "Professional", "cycle": "annual", "payment_method": "pix" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["session_id"].is_string());
        assert_eq!(body["view"]["state"], "processing");
        assert_eq!(body["view"]["price"], "790");

        sleep_ms(1100).await;
        let (_, _, body) = send(&app, "GET", "/api/checkout", Some(&token), None).await;
        assert_eq!(body["view"]["progress"], 50);

        sleep_ms(1500).await;
        let (_, _, body) = send(&app, "GET", "/api/checkout", Some(&token), None).await;
        assert_eq!(body["view"]["state"], "succeeded");
        assert_eq!(body["notifications"][0]["title"], "Payment approved");
        assert!(body["redirect"].is_null());

        let (_, _, records) = send(&app, "GET", "/api/subscriptions", Some(&token), None).await;
        assert_eq!(records.as_array().unwrap().len(), 1);
        assert_eq!(records[0]["plan_name"], "Professional");
        assert_eq!(records[0]["plan_price"], "790");
        assert_eq!(records[0]["payment_method"], "Pix");

        sleep_ms(3000).await;
        let (_, _, body) = send(&app, "GET", "/api/checkout", Some(&token), None).await;
        assert!(body["view"].is_null());
        assert!(body["snapshot"].is_null());
        assert_eq!(body["redirect"], "/");
        assert_eq!(body["notifications"][0]["title"], Notification::subscription_activated().title);

        // The dialog dismissed itself; nothing is left to retry
        let (status, _, body) = send(&app, "POST", "/api/checkout/retry", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "SESSION_NOT_FOUND");
        assert_eq!(state.store.insert_attempts(), 1);
    }

    #[tokio::test]
    async fn test_checkout_rejections() {
        let (app, _) = app_with(FixedRandom::approving());
        let token = sign_in_as(&app, "ana@example.com").await;

        let (status, _, body) = send(
            &app,
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({ "plan": "Starter", "payment_method": "card" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _, body) = send(
            &app,
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({ "plan": "Platinum" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_PLAN");

        // The Starter dialog from the rejected confirmation is still open
        let (status, _, body) = send(&app, "POST", "/api/checkout/retry", Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "NOT_RETRYABLE");

        send(&app, "DELETE", "/api/checkout", Some(&token), None).await;
        let (status, _, body) = send(&app, "POST", "/api/checkout/retry", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_then_retry() {
        let (app, state) = app_with(FixedRandom::declining());
        let token = sign_in_as(&app, "ana@example.com").await;

        send(
            &app,
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({ "plan": "Starter", "payment_method": "digital-wallet" })),
        )
        .await;

        let (status, _, body) = send(&app, "POST", "/api/checkout/retry", Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "NOT_RETRYABLE");

        sleep_ms(2600).await;
        let (_, _, body) = send(&app, "GET", "/api/checkout", Some(&token), None).await;
        assert_eq!(body["view"]["state"], "failed");
        assert_eq!(body["notifications"][0]["variant"], "destructive");

        let (status, _, body) = send(&app, "POST", "/api/checkout/retry", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "idle");
        assert_eq!(body["can_confirm"], true);
        assert_eq!(state.store.insert_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_mid_checkout() {
        let (app, state) = app_with(FixedRandom::approving());
        let token = sign_in_as(&app, "ana@example.com").await;

        send(
            &app,
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({ "plan": "Enterprise", "payment_method": "pix" })),
        )
        .await;
        sleep_ms(600).await;

        let (status, _, _) = send(&app, "DELETE", "/api/session", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        sleep_ms(5000).await;
        assert_eq!(state.store.insert_attempts(), 0);
        assert_eq!(state.client_count().await, 0);

        let (status, _, body) = send(&app, "GET", "/api/checkout", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "AUTH_REQUIRED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_checkout_cancels() {
        let (app, state) = app_with(FixedRandom::approving());
        let token = sign_in_as(&app, "ana@example.com").await;

        send(
            &app,
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({ "plan": "Professional", "payment_method": "pix" })),
        )
        .await;
        sleep_ms(900).await;

        let (status, _, _) = send(&app, "DELETE", "/api/checkout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        sleep_ms(5000).await;
        let (_, _, body) = send(&app, "GET", "/api/checkout", Some(&token), None).await;
        assert!(body["view"].is_null());
        assert_eq!(state.store.insert_attempts(), 0);
    }
}
