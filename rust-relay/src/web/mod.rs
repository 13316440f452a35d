//! Web server module for the relay endpoint.
//!
//! This module provides a thin web server that:
//! - Checks the shared secret on every non-health request
//! - Forwards accepted bodies to the upstream send API
//! - Mirrors the upstream response back unchanged
//!
//! `GET /health` is the only route that skips the secret check.

pub mod auth;
pub mod handlers;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

pub use auth::{verify_secret_header, SecretKey, SECRET_HEADER};
pub use handlers::{health, relay, AppState, HealthResponse, RelayError};

/// Build the relay router.
///
/// Every method and path other than `GET /health` reaches [`relay`].
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health).fallback(relay))
        .fallback(relay)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
