//! Store error types.

use pantry_fetch::FetchError;
use thiserror::Error;

/// Errors that can occur in the engine, its services and configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No projection matches the given identity or barcode.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Another engine operation is running.
    #[error("Refresh already in progress")]
    RefreshInProgress,

    /// The engine has been closed.
    #[error("Engine is closed")]
    Closed,

    /// A service call could not be parsed.
    #[error("Invalid service call: {0}")]
    InvalidServiceCall(String),

    /// Remote call failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored configuration could not be migrated.
    #[error("Config migration failed: {0}")]
    Migration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::RefreshInProgress | StoreError::Io(_) => true,
            StoreError::Fetch(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::RefreshInProgress.is_transient());
        assert!(
            StoreError::Fetch(FetchError::Status {
                status: 502,
                endpoint: "/update_count".into()
            })
            .is_transient()
        );
        assert!(!StoreError::Fetch(FetchError::Rejected("nope".into())).is_transient());
        assert!(!StoreError::EntityNotFound("sensor.product_milk".into()).is_transient());
        assert!(!StoreError::Closed.is_transient());
    }
}
