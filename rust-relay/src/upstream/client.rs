//! MailChannels send API client.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{error, info};
use url::Url;

use super::{Upstream, UpstreamError, UpstreamResponse};

/// Outbound client for the transactional-email send endpoint.
///
/// Holds a single `reqwest::Client` so connections are pooled across
/// requests.
#[derive(Debug, Clone)]
pub struct MailChannelsClient {
    client: Client,
    url: Url,
}

impl MailChannelsClient {
    /// Create a client for `url`. Without a timeout the transport default
    /// applies.
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(UpstreamError::Client)?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Upstream for MailChannelsClient {
    async fn send(&self, body: Bytes) -> Result<UpstreamResponse, UpstreamError> {
        let body_length = body.len();

        info!(
            host = self.url.host_str().unwrap_or(""),
            body_length = body_length,
            "upstream_request_starting"
        );

        let resp = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!(error = %e, "upstream_request_timeout");
                } else if e.is_connect() {
                    error!(error = %e, "upstream_connect_error");
                } else {
                    error!(error = %e, "upstream_request_error");
                }
                UpstreamError::Request(e)
            })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|e| {
            error!(status_code = status.as_u16(), error = %e, "upstream_body_read_error");
            UpstreamError::Body(e)
        })?;

        info!(
            status_code = status.as_u16(),
            is_success = status.is_success(),
            response_length = body.len(),
            "upstream_request_complete"
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
