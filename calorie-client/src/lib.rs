//! Calorie Client - Request Gateway
//!
//! Typed access to the food collection API. Every call attaches the
//! current session token, classifies failures, and retries transient ones
//! with exponential backoff.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;

pub use auth::{EnvToken, FileToken, NoToken, StaticToken, TokenError, TokenProvider};
pub use client::GatewayClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{classify_status, ErrorKind, GatewayError};
pub use retry::{RetryNotice, RetryObserver, RetryPolicy};
