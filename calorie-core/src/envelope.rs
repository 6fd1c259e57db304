//! Response envelope shared by every handler response.
//!
//! Wire shape:
//! `{ success, data?, error?, source?, message?, query?, details? }`
//! with absent fields omitted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance of a response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Answered by the relational store.
    Database,
    /// Answered from the in-memory fallback catalog.
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Database => "database",
            Source::Fallback => "fallback",
        }
    }

    /// Whether the payload is authoritative.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Source::Database)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform JSON wrapper returned by the query handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `data` from `source`.
    pub fn ok(data: T, source: Source) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            source: Some(source),
            message: None,
            query: None,
            details: None,
        }
    }

    /// Failed envelope with a caller-facing error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            source: None,
            message: None,
            query: None,
            details: None,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A payload tagged with where it came from.
///
/// `source` is `None` when the responder did not report provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub source: Option<Source>,
}

impl<T> Sourced<T> {
    pub fn new(data: T, source: Source) -> Self {
        Self {
            data,
            source: Some(source),
        }
    }

    pub fn untagged(data: T) -> Self {
        Self { data, source: None }
    }

    /// True when the payload came from the fallback catalog.
    pub fn is_fallback(&self) -> bool {
        self.source == Some(Source::Fallback)
    }

    pub fn into_inner(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            data: f(self.data),
            source: self.source,
        }
    }
}
