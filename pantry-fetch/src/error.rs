//! Fetch error types.

use pantry_core::CollectionKind;
use thiserror::Error;

/// Error type for remote pantry operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed at the transport level.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status other than 200.
    #[error("Unexpected status {status} from {endpoint}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Endpoint path.
        endpoint: String,
    },

    /// The response body is not the container type the collection requires.
    #[error("Expected a JSON {expected} from {kind}, got {found}")]
    UnexpectedShape {
        /// Collection that was fetched.
        kind: CollectionKind,
        /// Expected container type.
        expected: &'static str,
        /// What actually arrived.
        found: &'static str,
    },

    /// Invalid response from the server.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The server processed the request but reported a failure.
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The client could not be configured.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The client has been closed.
    #[error("Client is closed")]
    Closed,
}

impl FetchError {
    /// Returns true if a later attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::UnexpectedShape { .. }
            | FetchError::InvalidResponse(_)
            | FetchError::Json(_) => true,
            FetchError::Rejected(_) | FetchError::InvalidConfig(_) | FetchError::Closed => false,
        }
    }
}

/// Names the JSON type of a value for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let server_error = FetchError::Status {
            status: 503,
            endpoint: "/products".into(),
        };
        let not_found = FetchError::Status {
            status: 404,
            endpoint: "/products".into(),
        };
        assert!(server_error.is_transient());
        assert!(!not_found.is_transient());
        assert!(!FetchError::Closed.is_transient());
    }

    #[test]
    fn test_shape_message() {
        let err = FetchError::UnexpectedShape {
            kind: CollectionKind::Counts,
            expected: "object",
            found: "array",
        };
        assert_eq!(err.to_string(), "Expected a JSON object from counts, got array");
    }
}
