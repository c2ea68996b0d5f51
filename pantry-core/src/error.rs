//! Core error types for Pantry Tracker.

use thiserror::Error;

/// Core error type for Pantry Tracker operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is absent from a remote record.
    #[error("Missing field '{field}' in {context}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
        /// Short description of the offending record.
        context: String,
    },

    /// Invalid data from API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
