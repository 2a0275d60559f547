//! Error types for decoding upstream sale records
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Sale decoding errors
///
/// Any of these makes a single sale malformed; it is dropped without
/// affecting the rest of its batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaleError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid number in field {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Malformed sale record: {reason}")]
    Malformed { reason: String },
}

impl SaleError {
    pub fn missing(field: &'static str) -> Self {
        SaleError::MissingField { field }
    }

    pub fn invalid_number(field: &'static str, value: impl ToString) -> Self {
        SaleError::InvalidNumber {
            field,
            value: value.to_string(),
        }
    }
}
