//! Google Cloud client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Google Cloud REST APIs
#[derive(Debug, Error)]
pub enum GcpError {
    /// HTTP transport error (connection refused, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Google API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the Google error envelope, or the raw body
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (missing, invalid or expired token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GcpError {
    /// True when the provider reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GcpError::NotFound(_))
    }
}
