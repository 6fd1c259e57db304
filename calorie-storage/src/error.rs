//! Storage layer errors.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`crate::FoodStore`] or [`crate::StoreConnector`].
///
/// The `reason` strings are for logs only; handlers never forward them to
/// callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("query failed: {reason}")]
    Query { reason: String },

    #[error("store configuration error: {reason}")]
    Config { reason: String },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn query(reason: impl Into<String>) -> Self {
        Self::Query {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// True when the error means the store cannot be reached at all, as
    /// opposed to a single statement failing on a live connection.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. } | StoreError::Config { .. })
    }
}
