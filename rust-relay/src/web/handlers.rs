//! Relay endpoint handlers.
//!
//! The relay handler does exactly three things:
//! 1. Verify the `X-Secret-Key` header
//! 2. Forward the raw body to the upstream send API
//! 3. Mirror the upstream response back to the caller

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, FromRequest, Request, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::upstream::{MailChannelsClient, Upstream, UpstreamError, UpstreamResponse};
use crate::web::auth::{verify_secret_header, SecretKey};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub secret: Arc<SecretKey>,
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    pub fn new(secret: SecretKey, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            secret: Arc::new(secret),
            upstream,
        }
    }

    /// Build state with the production MailChannels client.
    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        let client = MailChannelsClient::new(config.upstream_url.clone(), config.upstream_timeout)?;
        Ok(Self::new(config.secret_key.clone(), Arc::new(client)))
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Relay failures that the handler answers itself.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid secret key")]
    Unauthorized,

    #[error(transparent)]
    Body(#[from] BytesRejection),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Unauthorized => (StatusCode::FORBIDDEN, "Invalid secret key").into_response(),
            RelayError::Body(rejection) => rejection.into_response(),
            RelayError::Upstream(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Relay
// =============================================================================

/// Relay endpoint.
///
/// Accepts any method and path. The secret is checked before the body is
/// read, so rejected callers never get their body buffered. An accepted
/// body is buffered once and forwarded byte for byte; the upstream's
/// status, headers and body come back unchanged apart from
/// connection-level headers.
pub async fn relay(State(state): State<AppState>, request: Request) -> Result<Response, RelayError> {
    info!(
        method = %request.method(),
        path = %request.uri().path(),
        "relay_request_received"
    );

    if !verify_secret_header(&state.secret, request.headers()) {
        return Err(RelayError::Unauthorized);
    }

    // Honours the router's `DefaultBodyLimit`.
    let body = Bytes::from_request(request, &state).await.map_err(|e| {
        warn!(status_code = e.status().as_u16(), error = %e, "relay_body_rejected");
        RelayError::from(e)
    })?;

    let body_length = body.len();
    let upstream = state.upstream.send(body).await.map_err(|e| {
        error!(body_length = body_length, error = %e, "relay_upstream_failed");
        RelayError::from(e)
    })?;

    info!(
        body_length = body_length,
        status_code = upstream.status.as_u16(),
        response_length = upstream.body.len(),
        "relay_forwarded"
    );

    Ok(mirror_response(upstream))
}

/// Headers that describe a single connection and are not forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Turn a buffered upstream response into the caller's response.
fn mirror_response(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse {
        status,
        mut headers,
        body,
    } = upstream;

    // Tokens listed in `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    // Re-framed from the buffered body.
    headers.remove(header::CONTENT_LENGTH);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
