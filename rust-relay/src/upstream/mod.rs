//! Upstream module for the outbound send call.
//!
//! The relay talks to the transactional-email API through the [`Upstream`]
//! trait. Production uses [`MailChannelsClient`]; tests substitute a
//! recording double.
//!
//! ## Flow
//!
//! ```text
//! Relay handler → Upstream::send(body) → POST upstream_url → UpstreamResponse
//! ```

pub mod client;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

pub use client::MailChannelsClient;

/// Failures that prevent an upstream response from being obtained.
///
/// A non-2xx status is not an error: it is returned as data and mirrored to
/// the caller.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("failed to read upstream response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Destination for accepted relay requests.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// POST `body` unchanged as `application/json` and return the response.
    async fn send(&self, body: Bytes) -> Result<UpstreamResponse, UpstreamError>;
}
