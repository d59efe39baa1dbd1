//! Controller-specific error types.
//!
//! Provider errors are folded into this taxonomy at the boundary so that
//! reconcilers can branch on `NotFound` without inspecting HTTP details.

use gcp_client::GcpError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while provisioning a controlplane.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The resource does not exist; drives create/delete branching
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider or network failure during a request
    #[error("Google Cloud request failed: {0}")]
    Transient(#[source] GcpError),

    /// A long-running operation finished with an error
    #[error("Operation {operation} failed: {message}")]
    OperationFailed {
        /// Provider operation name
        operation: String,
        /// Provider error message, verbatim
        message: String,
    },

    /// Required input is missing, or a resource that must exist does not
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// A bounded wait gave up; the provider operation may still be running
    #[error("Timed out after {waited:?} waiting for {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// How long we waited
        waited: Duration,
    },

    /// The caller cancelled the run
    #[error("Cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Manifest could not be read, parsed or rendered
    #[error("Manifest error: {0}")]
    Manifest(String),
}

impl ControllerError {
    /// Map a provider error from an existence lookup
    ///
    /// Only lookups keep `NotFound`; it never leaves the reconcilers.
    pub fn from_lookup(error: GcpError) -> Self {
        match error {
            GcpError::NotFound(message) => ControllerError::NotFound(message),
            other => ControllerError::Transient(other),
        }
    }

    /// Turn a stray `NotFound` into the error a caller sees
    pub fn surfaced(self) -> Self {
        match self {
            ControllerError::NotFound(message) => {
                ControllerError::PreconditionFailed(format!("required resource is missing: {}", message))
            }
            other => other,
        }
    }
}

/// A 404 from anything but a lookup means a dependency is missing
impl From<GcpError> for ControllerError {
    fn from(error: GcpError) -> Self {
        ControllerError::from_lookup(error).surfaced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_lookup_keeps_not_found_distinct() {
        let err = ControllerError::from_lookup(GcpError::NotFound("network demo".to_string()));
        assert!(matches!(err, ControllerError::NotFound(_)));
    }

    #[test]
    fn test_not_found_outside_lookup_is_precondition_failure() {
        let err = ControllerError::from(GcpError::NotFound("NodePool default-pool not found".to_string()));
        assert!(matches!(err, ControllerError::PreconditionFailed(ref m) if m.contains("default-pool")));
    }

    #[test]
    fn test_surfaced_never_returns_not_found() {
        let err = ControllerError::NotFound("cluster demo".to_string()).surfaced();
        assert!(matches!(err, ControllerError::PreconditionFailed(_)));
        assert!(matches!(ControllerError::Cancelled.surfaced(), ControllerError::Cancelled));
    }

    #[test]
    fn test_other_provider_errors_are_transient_with_source() {
        let err = ControllerError::from(GcpError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        });
        assert!(matches!(err, ControllerError::Transient(_)));
        let source = err.source().expect("transient errors keep their cause");
        assert!(source.to_string().contains("backend unavailable"));
    }
}
