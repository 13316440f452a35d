//! Shared-secret verification for the relay endpoint.
//!
//! Callers authenticate by sending the deployment's secret verbatim in the
//! `X-Secret-Key` header. The configured value lives in [`SecretKey`], which
//! never renders its contents through `Debug` or `Display`.

use std::fmt;

use axum::http::{HeaderMap, HeaderValue};
use tracing::warn;

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "X-Secret-Key";

/// The configured shared secret.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a secret value. Empty or whitespace-only values are rejected.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self(value))
    }

    /// Exact byte equality against a provided header value.
    ///
    /// An absent value never matches.
    pub fn matches(&self, provided: Option<&[u8]>) -> bool {
        match provided {
            Some(provided) => constant_time_compare(self.0.as_bytes(), provided),
            None => false,
        }
    }

    /// Whether a client can send this secret verbatim in a header.
    ///
    /// Control characters are not legal header bytes, and surrounding
    /// whitespace is stripped by HTTP parsers before the value arrives.
    pub fn is_header_safe(&self) -> bool {
        let trimmed = self.0.trim_matches(|c: char| c == ' ' || c == '\t');
        trimmed.len() == self.0.len() && HeaderValue::from_bytes(self.0.as_bytes()).is_ok()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Check the `X-Secret-Key` header against the configured secret.
///
/// The raw header bytes are compared, so non-ASCII secrets match when the
/// caller sends the same UTF-8 bytes.
pub fn verify_secret_header(secret: &SecretKey, headers: &HeaderMap) -> bool {
    let provided = headers.get(SECRET_HEADER).map(HeaderValue::as_bytes);

    let valid = secret.matches(provided);

    if !valid {
        // Lengths only; the submitted value is never logged.
        warn!(
            header_present = headers.contains_key(SECRET_HEADER),
            provided_length = provided.map(<[u8]>::len).unwrap_or(0),
            "relay_secret_invalid"
        );
    }

    valid
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
