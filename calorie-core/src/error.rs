//! Error types for calorie-core validation

use thiserror::Error;

/// Validation errors raised while building a [`crate::NewFoodItem`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    RequiredFieldMissing { field: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::RequiredFieldMissing { field }
            | ValidationError::InvalidValue { field, .. } => field,
        }
    }
}
