//! Helper functions for common reconciliation patterns
//!
//! Every resource kind answers "does it exist?" the same way: a lookup that
//! fails with `NotFound` means absent, any other failure is a real error and
//! must not be mistaken for absence.

use crate::error::ControllerError;
use std::future::Future;
use tracing::{debug, error};

/// Look a resource up, turning `NotFound` into `None`
///
/// Returns:
/// - `Ok(Some(resource))` if the resource exists
/// - `Ok(None)` if the provider reports it absent
/// - `Err(e)` for any other failure (auth, network, cancellation)
pub async fn check_existing<FGet, Resource>(
    kind: &str,
    name: &str,
    get: FGet,
) -> Result<Option<Resource>, ControllerError>
where
    FGet: Future<Output = Result<Resource, ControllerError>>,
{
    match get.await {
        Ok(existing) => {
            debug!("{} {} exists", kind, name);
            Ok(Some(existing))
        }
        Err(ControllerError::NotFound(_)) => {
            debug!("{} {} does not exist", kind, name);
            Ok(None)
        }
        Err(e) => {
            error!("Failed to look up {} {}: {}", kind, name, e);
            Err(e)
        }
    }
}

/// Look a resource up for an update; absence is a precondition failure
pub async fn require_existing<FGet, Resource>(
    kind: &str,
    name: &str,
    get: FGet,
) -> Result<Resource, ControllerError>
where
    FGet: Future<Output = Result<Resource, ControllerError>>,
{
    check_existing(kind, name, get).await?.ok_or_else(|| {
        ControllerError::PreconditionFailed(format!("{} {} does not exist; run create first", kind, name))
    })
}

/// Reject an empty required field before any provider call is made
pub fn require_field(kind: &str, field: &str, value: &str) -> Result<(), ControllerError> {
    if value.trim().is_empty() {
        return Err(ControllerError::PreconditionFailed(format!("{} {} must not be empty", kind, field)));
    }
    Ok(())
}

#[cfg(test)]
#[path = "reconcile_helpers_test.rs"]
mod reconcile_helpers_test;
