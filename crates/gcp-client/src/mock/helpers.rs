//! Shared plumbing for the mock capability clients

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mock store, recovering the data if a panicking test poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Trailing segment of a resource name (`demo` for `projects/p/.../demo`)
pub(crate) fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Split `projects/p/locations/l/clusters/c/nodePools/np` into (cluster name, pool id)
pub(crate) fn split_node_pool_name(name: &str) -> Option<(&str, &str)> {
    let (cluster, pool) = name.rsplit_once("/nodePools/")?;
    Some((cluster, pool))
}

/// An in-flight provider operation
///
/// The mutation it stands for is applied when the operation is issued; the
/// operation itself only reports RUNNING for `remaining_polls` lookups and
/// then DONE, carrying `error` if a failure was injected for its target.
#[derive(Debug, Clone)]
pub(crate) struct MockOperation {
    pub(crate) operation_type: String,
    pub(crate) target: String,
    pub(crate) region: Option<String>,
    pub(crate) remaining_polls: u32,
    pub(crate) error: Option<String>,
}

impl MockOperation {
    /// Advance by one poll; returns true once the operation is done
    pub(crate) fn poll(&mut self) -> bool {
        if self.remaining_polls == 0 {
            return true;
        }
        self.remaining_polls -= 1;
        false
    }

    pub(crate) fn is_done(&self) -> bool {
        self.remaining_polls == 0
    }
}

/// Pending version-state convergence (KMS reports the old state for a while)
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingTransition {
    pub(crate) remaining_polls: u32,
    pub(crate) target: crate::models::CryptoKeyVersionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_node_pool_name() {
        let (cluster, pool) = split_node_pool_name(
            "projects/demo/locations/us-central1/clusters/demo-controlplane/nodePools/default-pool",
        )
        .unwrap();
        assert_eq!(cluster, "projects/demo/locations/us-central1/clusters/demo-controlplane");
        assert_eq!(pool, "default-pool");
        assert!(split_node_pool_name("projects/demo").is_none());
    }

    #[test]
    fn test_operation_reports_running_then_done() {
        let mut op = MockOperation {
            operation_type: "insert".to_string(),
            target: "demo".to_string(),
            region: None,
            remaining_polls: 2,
            error: None,
        };
        assert!(!op.poll());
        assert!(!op.poll());
        assert!(op.poll());
        assert!(op.is_done());
    }
}
