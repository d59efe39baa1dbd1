//! Mock Google Cloud client for unit testing
//!
//! This module provides an in-memory implementation of every capability trait
//! so the provisioner can be exercised without a Google Cloud project.
//!
//! The mock is organized into API-specific modules:
//! - `compute.rs` - networks, subnetworks, routers, firewalls and compute operations
//! - `kms.rs` - key rings, crypto keys, key versions and IAM policies
//! - `container.rs` - GKE clusters, node pools and operations
//! - `resource_manager.rs` - project lookup and service enablement
//! - `helpers.rs` - locking, naming and operation bookkeeping
//!
//! Every call is appended to a call log as `"<method> <short resource name>"`
//! (for example `"insert_network demo"`), which tests use to assert ordering.

mod compute;
mod container;
mod helpers;
mod kms;
mod resource_manager;

use crate::error::GcpError;
use crate::gcp_trait::*;
use crate::models::*;
use helpers::{MockOperation, PendingTransition, lock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock Google Cloud client for testing
///
/// Resources live in memory. Long-running operations stay RUNNING for a
/// configurable number of polls, and failures can be injected per method
/// (one-shot transport errors) or per resource (operations that finish with an error).
#[derive(Clone, Debug)]
pub struct MockGcpClient {
    pub(crate) compute_base: String,
    // Compute, keyed by "project/name" or "project/region/name"
    pub(crate) networks: Arc<Mutex<HashMap<String, Network>>>,
    pub(crate) subnetworks: Arc<Mutex<HashMap<String, Subnetwork>>>,
    pub(crate) routers: Arc<Mutex<HashMap<String, Router>>>,
    pub(crate) firewalls: Arc<Mutex<HashMap<String, Firewall>>>,
    pub(crate) compute_operations: Arc<Mutex<HashMap<String, MockOperation>>>,
    // KMS, keyed by full resource name
    pub(crate) key_rings: Arc<Mutex<HashMap<String, KeyRing>>>,
    pub(crate) crypto_keys: Arc<Mutex<HashMap<String, CryptoKey>>>,
    pub(crate) key_versions: Arc<Mutex<HashMap<String, CryptoKeyVersion>>>,
    pub(crate) pending_transitions: Arc<Mutex<HashMap<String, PendingTransition>>>,
    pub(crate) iam_policies: Arc<Mutex<HashMap<String, Policy>>>,
    // GKE, keyed by full cluster name; operations by short id
    pub(crate) clusters: Arc<Mutex<HashMap<String, Cluster>>>,
    pub(crate) container_operations: Arc<Mutex<HashMap<String, MockOperation>>>,
    // Resource manager / service usage
    pub(crate) projects: Arc<Mutex<HashMap<String, Project>>>,
    pub(crate) enabled_services: Arc<Mutex<HashMap<String, Vec<String>>>>,
    pub(crate) service_operations: Arc<Mutex<HashMap<String, MockOperation>>>,
    // Behaviour knobs
    pub(crate) polls_until_done: Arc<Mutex<u32>>,
    pub(crate) version_convergence_polls: Arc<Mutex<u32>>,
    pub(crate) failures: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) operation_failures: Arc<Mutex<HashMap<String, String>>>,
    // Call log and id counter
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl Default for MockGcpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGcpClient {
    /// Create a new, empty mock client
    pub fn new() -> Self {
        Self {
            compute_base: "https://www.googleapis.com/compute/v1".to_string(),
            networks: Arc::new(Mutex::new(HashMap::new())),
            subnetworks: Arc::new(Mutex::new(HashMap::new())),
            routers: Arc::new(Mutex::new(HashMap::new())),
            firewalls: Arc::new(Mutex::new(HashMap::new())),
            compute_operations: Arc::new(Mutex::new(HashMap::new())),
            key_rings: Arc::new(Mutex::new(HashMap::new())),
            crypto_keys: Arc::new(Mutex::new(HashMap::new())),
            key_versions: Arc::new(Mutex::new(HashMap::new())),
            pending_transitions: Arc::new(Mutex::new(HashMap::new())),
            iam_policies: Arc::new(Mutex::new(HashMap::new())),
            clusters: Arc::new(Mutex::new(HashMap::new())),
            container_operations: Arc::new(Mutex::new(HashMap::new())),
            projects: Arc::new(Mutex::new(HashMap::new())),
            enabled_services: Arc::new(Mutex::new(HashMap::new())),
            service_operations: Arc::new(Mutex::new(HashMap::new())),
            polls_until_done: Arc::new(Mutex::new(0)),
            version_convergence_polls: Arc::new(Mutex::new(0)),
            failures: Arc::new(Mutex::new(HashMap::new())),
            operation_failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    // ---- behaviour knobs -------------------------------------------------

    /// Number of status lookups for which new operations report RUNNING
    pub fn set_polls_until_done(&self, polls: u32) {
        *lock(&self.polls_until_done) = polls;
    }

    /// Number of version lookups before a re-enabled key version reports ENABLED
    pub fn set_version_convergence_polls(&self, polls: u32) {
        *lock(&self.version_convergence_polls) = polls;
    }

    /// Make the next call to `method` fail with a 503 before touching any state
    pub fn fail_next_call(&self, method: &str, message: &str) {
        lock(&self.failures).insert(method.to_string(), message.to_string());
    }

    /// Make every operation targeting `resource` (short name) finish with an error.
    /// The mutation is not applied.
    pub fn fail_operation_for(&self, resource: &str, message: &str) {
        lock(&self.operation_failures).insert(resource.to_string(), message.to_string());
    }

    /// Stop failing operations for `resource`
    pub fn clear_operation_failure(&self, resource: &str) {
        lock(&self.operation_failures).remove(resource);
    }

    // ---- test setup ------------------------------------------------------

    /// Add a project to the mock store (for test setup)
    pub fn add_project(&self, project_id: &str, project_number: &str) {
        lock(&self.projects).insert(
            project_id.to_string(),
            Project {
                name: format!("projects/{}", project_number),
                project_id: project_id.to_string(),
                state: Some("ACTIVE".to_string()),
                display_name: Some(project_id.to_string()),
            },
        );
    }

    /// Add a network to the mock store (for test setup)
    pub fn add_network(&self, project: &str, network: Network) {
        let network = compute::with_network_link(self, project, network);
        lock(&self.networks).insert(format!("{}/{}", project, network.name), network);
    }

    /// Add a subnetwork to the mock store (for test setup)
    pub fn add_subnetwork(&self, project: &str, region: &str, subnetwork: Subnetwork) {
        let subnetwork = compute::with_subnetwork_link(self, project, region, subnetwork);
        lock(&self.subnetworks).insert(format!("{}/{}/{}", project, region, subnetwork.name), subnetwork);
    }

    /// Add a cluster to the mock store (for test setup)
    pub fn add_cluster(&self, name: &str, cluster: Cluster) {
        lock(&self.clusters).insert(name.to_string(), cluster);
    }

    /// Force the state of a key version (for test setup)
    ///
    /// Returns false if the version does not exist.
    pub fn set_key_version_state(&self, name: &str, state: CryptoKeyVersionState) -> bool {
        match lock(&self.key_versions).get_mut(name) {
            Some(version) => {
                version.state = state;
                true
            }
            None => false,
        }
    }

    // ---- inspection ------------------------------------------------------

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of times `call` (e.g. `"insert_network demo"`) was made
    pub fn call_count(&self, call: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.as_str() == call).count()
    }

    /// Index of the first occurrence of `call` in the call log
    pub fn position(&self, call: &str) -> Option<usize> {
        lock(&self.calls).iter().position(|c| c == call)
    }

    /// Forget the call log
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Services enabled on `parent` (`projects/{id}`)
    pub fn enabled_services(&self, parent: &str) -> Vec<String> {
        lock(&self.enabled_services).get(parent).cloned().unwrap_or_default()
    }

    /// Stored state of a key version
    pub fn key_version_state(&self, name: &str) -> Option<CryptoKeyVersionState> {
        lock(&self.key_versions).get(name).map(|v| v.state)
    }

    /// Stored IAM policy for a KMS resource
    pub fn iam_policy(&self, resource: &str) -> Option<Policy> {
        lock(&self.iam_policies).get(resource).cloned()
    }

    /// Stored cluster
    pub fn cluster(&self, name: &str) -> Option<Cluster> {
        lock(&self.clusters).get(name).cloned()
    }

    // ---- internals -------------------------------------------------------

    /// Record a call and consume a pending injected failure for `method`
    pub(crate) fn begin(&self, method: &str, resource: &str) -> Result<(), GcpError> {
        lock(&self.calls).push(format!("{} {}", method, helpers::short_name(resource)));
        match lock(&self.failures).remove(method) {
            Some(message) => Err(GcpError::Api { status: 503, message }),
            None => Ok(()),
        }
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }

    /// Build an operation for `target`; the error is set if a failure was injected
    pub(crate) fn new_operation(&self, operation_type: &str, target: &str, region: Option<&str>) -> MockOperation {
        MockOperation {
            operation_type: operation_type.to_string(),
            target: target.to_string(),
            region: region.map(str::to_string),
            remaining_polls: *lock(&self.polls_until_done),
            error: lock(&self.operation_failures).get(helpers::short_name(target)).cloned(),
        }
    }
}

#[async_trait::async_trait]
impl ComputeOperationsClientTrait for MockGcpClient {
    async fn get_global_operation(&self, project: &str, operation: &str) -> Result<ComputeOperation, GcpError> {
        compute::get_operation(self, project, None, operation).await
    }

    async fn get_region_operation(
        &self,
        project: &str,
        region: &str,
        operation: &str,
    ) -> Result<ComputeOperation, GcpError> {
        compute::get_operation(self, project, Some(region), operation).await
    }
}

#[async_trait::async_trait]
impl NetworksClientTrait for MockGcpClient {
    async fn get_network(&self, project: &str, name: &str) -> Result<Network, GcpError> {
        compute::get_network(self, project, name).await
    }

    async fn insert_network(&self, project: &str, network: &Network) -> Result<ComputeOperation, GcpError> {
        compute::insert_network(self, project, network).await
    }

    async fn delete_network(&self, project: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        compute::delete_network(self, project, name).await
    }
}

#[async_trait::async_trait]
impl SubnetworksClientTrait for MockGcpClient {
    async fn get_subnetwork(&self, project: &str, region: &str, name: &str) -> Result<Subnetwork, GcpError> {
        compute::get_subnetwork(self, project, region, name).await
    }

    async fn insert_subnetwork(
        &self,
        project: &str,
        region: &str,
        subnetwork: &Subnetwork,
    ) -> Result<ComputeOperation, GcpError> {
        compute::insert_subnetwork(self, project, region, subnetwork).await
    }

    async fn delete_subnetwork(&self, project: &str, region: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        compute::delete_subnetwork(self, project, region, name).await
    }
}

#[async_trait::async_trait]
impl RoutersClientTrait for MockGcpClient {
    async fn get_router(&self, project: &str, region: &str, name: &str) -> Result<Router, GcpError> {
        compute::get_router(self, project, region, name).await
    }

    async fn insert_router(&self, project: &str, region: &str, router: &Router) -> Result<ComputeOperation, GcpError> {
        compute::insert_router(self, project, region, router).await
    }

    async fn delete_router(&self, project: &str, region: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        compute::delete_router(self, project, region, name).await
    }
}

#[async_trait::async_trait]
impl FirewallsClientTrait for MockGcpClient {
    async fn get_firewall(&self, project: &str, name: &str) -> Result<Firewall, GcpError> {
        compute::get_firewall(self, project, name).await
    }

    async fn insert_firewall(&self, project: &str, firewall: &Firewall) -> Result<ComputeOperation, GcpError> {
        compute::insert_firewall(self, project, firewall).await
    }

    async fn delete_firewall(&self, project: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        compute::delete_firewall(self, project, name).await
    }
}

#[async_trait::async_trait]
impl KmsClientTrait for MockGcpClient {
    async fn get_key_ring(&self, name: &str) -> Result<KeyRing, GcpError> {
        kms::get_key_ring(self, name).await
    }

    async fn create_key_ring(&self, parent: &str, key_ring_id: &str) -> Result<KeyRing, GcpError> {
        kms::create_key_ring(self, parent, key_ring_id).await
    }

    async fn get_crypto_key(&self, name: &str) -> Result<CryptoKey, GcpError> {
        kms::get_crypto_key(self, name).await
    }

    async fn create_crypto_key(
        &self,
        parent: &str,
        crypto_key_id: &str,
        key: &CryptoKey,
    ) -> Result<CryptoKey, GcpError> {
        kms::create_crypto_key(self, parent, crypto_key_id, key).await
    }

    async fn get_crypto_key_version(&self, name: &str) -> Result<CryptoKeyVersion, GcpError> {
        kms::get_crypto_key_version(self, name).await
    }

    async fn update_crypto_key_version(
        &self,
        name: &str,
        state: CryptoKeyVersionState,
    ) -> Result<CryptoKeyVersion, GcpError> {
        kms::update_crypto_key_version(self, name, state).await
    }

    async fn create_crypto_key_version(&self, parent: &str) -> Result<CryptoKeyVersion, GcpError> {
        kms::create_crypto_key_version(self, parent).await
    }

    async fn update_crypto_key_primary_version(
        &self,
        name: &str,
        version_id: &str,
    ) -> Result<CryptoKey, GcpError> {
        kms::update_crypto_key_primary_version(self, name, version_id).await
    }

    async fn restore_crypto_key_version(&self, name: &str) -> Result<CryptoKeyVersion, GcpError> {
        kms::restore_crypto_key_version(self, name).await
    }

    async fn get_iam_policy(&self, resource: &str) -> Result<Policy, GcpError> {
        kms::get_iam_policy(self, resource).await
    }

    async fn set_iam_policy(&self, resource: &str, policy: &Policy) -> Result<Policy, GcpError> {
        kms::set_iam_policy(self, resource, policy).await
    }
}

#[async_trait::async_trait]
impl ClusterManagerClientTrait for MockGcpClient {
    async fn get_cluster(&self, name: &str) -> Result<Cluster, GcpError> {
        container::get_cluster(self, name).await
    }

    async fn create_cluster(&self, parent: &str, cluster: &Cluster) -> Result<ContainerOperation, GcpError> {
        container::create_cluster(self, parent, cluster).await
    }

    async fn update_cluster(&self, name: &str, update: &ClusterUpdate) -> Result<ContainerOperation, GcpError> {
        container::update_cluster(self, name, update).await
    }

    async fn update_node_pool(&self, request: &UpdateNodePoolRequest) -> Result<ContainerOperation, GcpError> {
        container::update_node_pool(self, request).await
    }

    async fn delete_cluster(&self, name: &str) -> Result<ContainerOperation, GcpError> {
        container::delete_cluster(self, name).await
    }

    async fn get_operation(&self, name: &str) -> Result<ContainerOperation, GcpError> {
        container::get_operation(self, name).await
    }
}

#[async_trait::async_trait]
impl ProjectsClientTrait for MockGcpClient {
    async fn get_project(&self, project_id: &str) -> Result<Project, GcpError> {
        resource_manager::get_project(self, project_id).await
    }
}

#[async_trait::async_trait]
impl ServiceUsageClientTrait for MockGcpClient {
    async fn batch_enable_services(
        &self,
        parent: &str,
        services: &[String],
    ) -> Result<LongRunningOperation, GcpError> {
        resource_manager::batch_enable_services(self, parent, services).await
    }

    async fn get_service_operation(&self, name: &str) -> Result<LongRunningOperation, GcpError> {
        resource_manager::get_service_operation(self, name).await
    }
}
