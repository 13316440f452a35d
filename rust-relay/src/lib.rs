//! Mail Relay - authenticated pass-through to the MailChannels send API.
//!
//! A single HTTP endpoint checks the `X-Secret-Key` header against the
//! deployment's secret and, when it matches, forwards the request body
//! byte for byte to the transactional-email API.
//!
//! ## Architecture
//!
//! ```text
//! Caller → Web Server (secret check) → Upstream client → MailChannels
//! ```

pub mod config;
pub mod upstream;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use upstream::{MailChannelsClient, Upstream, UpstreamError, UpstreamResponse};
pub use web::{build_router, AppState, SecretKey};
