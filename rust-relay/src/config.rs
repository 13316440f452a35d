//! Configuration module for environment variable parsing.
//!
//! Everything is read once at process start and handed to the server by
//! value. Nothing here is mutated afterwards.

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::web::auth::SecretKey;

/// MailChannels transactional send endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.mailchannels.net/tx/v1/send";

/// Default inbound body cap (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Errors that prevent the relay from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SECRET_KEY is not set or is empty")]
    MissingSecret,

    #[error("SECRET_KEY contains control characters or surrounding whitespace and cannot be sent in a header")]
    InvalidSecret,

    #[error("UPSTREAM_URL is not a valid http(s) URL: {0}")]
    InvalidUpstreamUrl(String),
}

/// Relay configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret expected in `X-Secret-Key`
    pub secret_key: SecretKey,

    /// Port for the web server to listen on
    pub port: u16,

    /// Upstream send endpoint
    pub upstream_url: Url,

    /// Optional timeout for the outbound call
    pub upstream_timeout: Option<Duration>,

    /// Largest inbound body accepted, in bytes
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `from_env` is the production entry point; tests feed a map instead
    /// of touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY")
            .and_then(|raw| SecretKey::new(raw))
            .ok_or(ConfigError::MissingSecret)?;
        if !secret_key.is_header_safe() {
            return Err(ConfigError::InvalidSecret);
        }

        let upstream_url = match lookup("UPSTREAM_URL") {
            Some(raw) => parse_upstream_url(&raw)?,
            None => parse_upstream_url(DEFAULT_UPSTREAM_URL)?,
        };

        Ok(Config {
            secret_key,

            port: parse_or("PORT", &lookup, 8080),

            upstream_url,

            upstream_timeout: parse_optional::<u64, _>("UPSTREAM_TIMEOUT_MS", &lookup)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),

            max_body_bytes: parse_or("MAX_BODY_BYTES", &lookup, DEFAULT_MAX_BODY_BYTES),
        })
    }

    /// Outbound timeout in whole milliseconds, for logging.
    pub fn upstream_timeout_ms(&self) -> Option<u64> {
        self.upstream_timeout
            .and_then(|t| u64::try_from(t.as_millis()).ok())
    }
}

fn parse_upstream_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUpstreamUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUpstreamUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_or<T, F>(name: &str, lookup: &F, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(env_var = name, value = %raw, "Invalid value, using default");
                default
            }
        },
        None => default,
    }
}

/// Parse an optional numeric variable. Invalid values are treated as unset.
fn parse_optional<T, F>(name: &str, lookup: &F) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "s3cret")])).unwrap();

        assert!(config.secret_key.matches(Some(b"s3cret".as_slice())));
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_url.as_str(), DEFAULT_UPSTREAM_URL);
        assert_eq!(config.upstream_timeout, None);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_missing_secret() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_blank_secret() {
        let result = Config::from_lookup(lookup_from(&[("SECRET_KEY", "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_unsendable_secret() {
        for raw in [" leading", "trailing ", "multi\nline", "bell\u{7}"] {
            let result = Config::from_lookup(lookup_from(&[("SECRET_KEY", raw)]));
            assert!(matches!(result, Err(ConfigError::InvalidSecret)), "{:?}", raw);
        }
    }

    #[test]
    fn test_non_ascii_secret_is_accepted() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "caf\u{e9}")])).unwrap();
        assert!(config.secret_key.matches(Some("caf\u{e9}".as_bytes())));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "s3cret"),
            ("PORT", "9000"),
            ("UPSTREAM_URL", "http://127.0.0.1:4000/send"),
            ("UPSTREAM_TIMEOUT_MS", "2500"),
            ("MAX_BODY_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.upstream_url.as_str(), "http://127.0.0.1:4000/send");
        assert_eq!(config.upstream_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.upstream_timeout_ms(), Some(2500));
    }

    #[test]
    fn test_upstream_timeout_ms_overflow() {
        let mut config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.upstream_timeout_ms(), None);

        // Duration::MAX in milliseconds does not fit in a u64.
        config.upstream_timeout = Some(Duration::MAX);
        assert_eq!(config.upstream_timeout_ms(), None);

        config.upstream_timeout = Some(Duration::from_millis(u64::MAX));
        assert_eq!(config.upstream_timeout_ms(), Some(u64::MAX));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "s3cret"),
            ("PORT", "not-a-port"),
            ("UPSTREAM_TIMEOUT_MS", "soon"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_timeout, None);
    }

    #[test]
    fn test_zero_timeout_means_unset() {
        let config = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "s3cret"),
            ("UPSTREAM_TIMEOUT_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.upstream_timeout, None);
    }

    #[test]
    fn test_invalid_upstream_url() {
        let result = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "s3cret"),
            ("UPSTREAM_URL", "not a url"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidUpstreamUrl(_))));

        let result = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "s3cret"),
            ("UPSTREAM_URL", "ftp://example.com/send"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidUpstreamUrl(_))));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "hunter2-value")])).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2-value"));
    }
}
