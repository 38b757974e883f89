//! Checkout HTTP Server
//!
//! Axum server exposing the plan catalog and the simulated checkout, with
//! the WASM pricing page served from `STATIC_DIR`.

mod handlers;
mod state;

use std::sync::Arc;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_runtime::{CheckoutConfig, ThreadRandom};

use crate::handlers::api_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = CheckoutConfig::from_env()?;
    tracing::info!(
        tick_ms = config.tick_interval.as_millis(),
        resolve_ms = config.resolve_after.as_millis(),
        success_threshold = config.success_threshold,
        "Checkout configured"
    );

    let state = AppState::new(config, Arc::new(ThreadRandom));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".into());

    let app: Router = api_router()
        // Static files (WASM frontend)
        .fallback_service(ServeDir::new(&static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Checkout server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health              - Health check");
    tracing::info!("  GET    /api/plans           - Plan quotes (?cycle=monthly|annual)");
    tracing::info!("  POST   /api/session         - Demo sign-in");
    tracing::info!("  DELETE /api/session         - Sign out");
    tracing::info!("  POST   /api/checkout        - Start checkout");
    tracing::info!("  GET    /api/checkout        - Poll checkout");
    tracing::info!("  POST   /api/checkout/retry  - Retry failed checkout");
    tracing::info!("  DELETE /api/checkout        - Close checkout");
    tracing::info!("  GET    /api/subscriptions   - Stored subscriptions");
    tracing::info!("  Static files from {}", static_dir);

    axum::serve(listener, app).await?;

    Ok(())
}
