//! Failure classification for gateway calls.
//!
//! | Condition                       | Kind                  | Retryable |
//! |---------------------------------|-----------------------|-----------|
//! | transport failure               | `NETWORK_ERROR`       | yes       |
//! | 401                             | `UNAUTHORIZED`        | no        |
//! | 403                             | `FORBIDDEN`           | no        |
//! | 429                             | `RATE_LIMITED`        | yes       |
//! | 503                             | `SERVICE_UNAVAILABLE` | yes       |
//! | other 5xx                       | `SERVER_ERROR`        | yes       |
//! | other 4xx                       | `HTTP_ERROR`          | no        |
//! | anything else                   | `UNKNOWN_ERROR`       | no        |

use calorie_core::Envelope;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NetworkError,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServerError,
    ServiceUnavailable,
    HttpError,
    UnknownError,
}

impl ErrorKind {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError
                | ErrorKind::RateLimited
                | ErrorKind::ServerError
                | ErrorKind::ServiceUnavailable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::HttpError => "HTTP_ERROR",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Message shown when the server gave no error text of its own.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "Network error: unable to reach the server",
            ErrorKind::Unauthorized => "Authentication required. Please sign in again.",
            ErrorKind::Forbidden => "You do not have permission to perform this action.",
            ErrorKind::RateLimited => "Too many requests. Please wait and try again.",
            ErrorKind::ServerError => "Server error. Please try again later.",
            ErrorKind::ServiceUnavailable => "Service temporarily unavailable. Please try again later.",
            ErrorKind::HttpError => "Request failed",
            ErrorKind::UnknownError => "An unexpected error occurred",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 => ErrorKind::Unauthorized,
        403 => ErrorKind::Forbidden,
        429 => ErrorKind::RateLimited,
        503 => ErrorKind::ServiceUnavailable,
        500..=599 => ErrorKind::ServerError,
        400..=499 => ErrorKind::HttpError,
        _ => ErrorKind::UnknownError,
    }
}

/// A classified gateway failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    /// Human-readable; the server's `error` text when it sent one.
    pub message: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownError, message)
    }

    /// Build from a non-success response and its body text.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let kind = classify_status(status);
        let server_message = serde_json::from_str::<Envelope<serde_json::Value>>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .filter(|message| !message.trim().is_empty());
        let message = match (server_message, kind) {
            (Some(message), _) => message,
            (None, ErrorKind::HttpError) => {
                format!("Request failed with status {}", status.as_u16())
            }
            (None, kind) => kind.default_message().to_string(),
        };
        Self {
            kind,
            message,
            status: Some(status.as_u16()),
        }
    }

    /// Build from a transport-level failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        tracing::debug!(error = %err, "Transport error");
        if err.is_decode() || err.is_builder() {
            return Self::from_kind(ErrorKind::UnknownError);
        }
        Self::from_kind(ErrorKind::NetworkError)
    }

    pub fn retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
