//! Error Types for the Food API
//!
//! This module defines error handling for the handler layer:
//! - ErrorCode enum for categorizing errors
//! - ApiError struct carrying the code, a caller-facing message and the
//!   provenance of the answer when one applies
//! - IntoResponse implementation producing the response envelope
//!
//! Messages are always generic. Store and driver error text is logged and
//! never forwarded to callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use calorie_core::{Envelope, Source, ValidationError};
use calorie_storage::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Routes listed in the body of a route-not-found response.
pub const SUPPORTED_ROUTES: &str = "GET {prefix}, GET {prefix}/search?name=<term>, \
GET {prefix}/{id}, POST {prefix}, PUT {prefix}/{id}";

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for handler responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or invalid request input
    BadInput,

    /// Requested food item does not exist
    NotFound,

    /// No route matches the request
    RouteNotFound,

    /// The store cannot be reached and no fallback answer exists
    StoreUnavailable,

    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadInput => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound | ErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::BadInput => "Invalid request",
            ErrorCode::NotFound => "Food item not found",
            ErrorCode::RouteNotFound => "Route not found",
            ErrorCode::StoreUnavailable => "Database unavailable",
            ErrorCode::Internal => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by every handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: ErrorCode,

    /// Caller-facing error text, rendered as the envelope's `error` field
    pub message: String,

    /// Which data source produced this answer, when one did
    pub origin: Option<Source>,

    /// Extra guidance, rendered as the envelope's `message` field
    pub hint: Option<String>,

    /// Generic detail text, rendered as the envelope's `details` field
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            origin: None,
            hint: None,
            details: None,
        }
    }

    /// Create an error using the code's default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_origin(mut self, origin: Source) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadInput, message)
    }

    /// 404 for an id that neither the answering source knows.
    pub fn not_found(origin: Source) -> Self {
        Self::from_code(ErrorCode::NotFound).with_origin(origin)
    }

    /// 404 for a request no route handles, listing what is supported.
    pub fn route_not_found(prefix: &str) -> Self {
        Self::from_code(ErrorCode::RouteNotFound).with_hint(format!(
            "Supported routes: {}",
            SUPPORTED_ROUTES.replace("{prefix}", prefix)
        ))
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreUnavailable, message).with_origin(Source::Fallback)
    }

    pub fn internal() -> Self {
        Self::from_code(ErrorCode::Internal)
            .with_details("An unexpected error occurred while processing the request")
    }

    /// Render as the response envelope.
    pub fn to_envelope(&self) -> Envelope<()> {
        let mut envelope = Envelope::error(self.message.clone());
        envelope.source = self.origin;
        envelope.message = self.hint.clone();
        envelope.details = self.details.clone();
        envelope
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_envelope())).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { .. } => {
                ApiError::bad_input("Name and calories are required")
            }
            ValidationError::InvalidValue { field, .. } => {
                ApiError::bad_input(format!("Invalid value for {}", field))
            }
        }
    }
}

/// Store errors only become API errors when no fallback answer exists.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store error: {}", err);
        if err.is_connectivity() {
            ApiError::store_unavailable("Database unavailable")
        } else {
            ApiError::internal()
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("Rejected request body: {}", err);
        ApiError::bad_input("Request body must be valid JSON")
    }
}

/// Result type for handler operations.
pub type ApiResult<T> = Result<T, ApiError>;
