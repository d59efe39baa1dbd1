//! Capability traits for the Google Cloud clients
//!
//! Each provider surface the provisioner touches is a separate trait so that
//! resource reconcilers depend only on what they use. The concrete `GcpClient`
//! implements all of them, and tests use `MockGcpClient`.

use crate::error::GcpError;
use crate::models::*;

/// Compute Engine operation lookup, shared by every compute resource kind
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ComputeOperationsClientTrait: Send + Sync {
    /// Fetch a global operation (networks, firewalls)
    async fn get_global_operation(
        &self,
        project: &str,
        operation: &str,
    ) -> Result<ComputeOperation, GcpError>;

    /// Fetch a regional operation (subnetworks, routers)
    async fn get_region_operation(
        &self,
        project: &str,
        region: &str,
        operation: &str,
    ) -> Result<ComputeOperation, GcpError>;
}

/// VPC networks
#[async_trait::async_trait]
pub trait NetworksClientTrait: ComputeOperationsClientTrait {
    async fn get_network(&self, project: &str, name: &str) -> Result<Network, GcpError>;
    async fn insert_network(&self, project: &str, network: &Network) -> Result<ComputeOperation, GcpError>;
    async fn delete_network(&self, project: &str, name: &str) -> Result<ComputeOperation, GcpError>;
}

/// Regional subnetworks
#[async_trait::async_trait]
pub trait SubnetworksClientTrait: ComputeOperationsClientTrait {
    async fn get_subnetwork(&self, project: &str, region: &str, name: &str) -> Result<Subnetwork, GcpError>;
    async fn insert_subnetwork(
        &self,
        project: &str,
        region: &str,
        subnetwork: &Subnetwork,
    ) -> Result<ComputeOperation, GcpError>;
    async fn delete_subnetwork(&self, project: &str, region: &str, name: &str) -> Result<ComputeOperation, GcpError>;
}

/// Cloud Routers (and their NAT configuration)
#[async_trait::async_trait]
pub trait RoutersClientTrait: ComputeOperationsClientTrait {
    async fn get_router(&self, project: &str, region: &str, name: &str) -> Result<Router, GcpError>;
    async fn insert_router(&self, project: &str, region: &str, router: &Router) -> Result<ComputeOperation, GcpError>;
    async fn delete_router(&self, project: &str, region: &str, name: &str) -> Result<ComputeOperation, GcpError>;
}

/// VPC firewall rules
#[async_trait::async_trait]
pub trait FirewallsClientTrait: ComputeOperationsClientTrait {
    async fn get_firewall(&self, project: &str, name: &str) -> Result<Firewall, GcpError>;
    async fn insert_firewall(&self, project: &str, firewall: &Firewall) -> Result<ComputeOperation, GcpError>;
    async fn delete_firewall(&self, project: &str, name: &str) -> Result<ComputeOperation, GcpError>;
}

/// Cloud KMS key rings, keys, versions and IAM
///
/// KMS mutations complete synchronously; there is no operation to poll.
/// Resource arguments are full resource names.
#[async_trait::async_trait]
pub trait KmsClientTrait: Send + Sync {
    /// `name`: `projects/*/locations/*/keyRings/*`
    async fn get_key_ring(&self, name: &str) -> Result<KeyRing, GcpError>;
    /// `parent`: `projects/*/locations/*`
    async fn create_key_ring(&self, parent: &str, key_ring_id: &str) -> Result<KeyRing, GcpError>;

    async fn get_crypto_key(&self, name: &str) -> Result<CryptoKey, GcpError>;
    /// `parent`: the key ring name
    async fn create_crypto_key(
        &self,
        parent: &str,
        crypto_key_id: &str,
        key: &CryptoKey,
    ) -> Result<CryptoKey, GcpError>;

    async fn get_crypto_key_version(&self, name: &str) -> Result<CryptoKeyVersion, GcpError>;
    /// Patch the version state (`updateMask=state`)
    async fn update_crypto_key_version(
        &self,
        name: &str,
        state: CryptoKeyVersionState,
    ) -> Result<CryptoKeyVersion, GcpError>;
    /// `parent`: the crypto key name
    async fn create_crypto_key_version(&self, parent: &str) -> Result<CryptoKeyVersion, GcpError>;
    /// `version_id` is the trailing id only (`"2"`), not the full name
    async fn update_crypto_key_primary_version(
        &self,
        name: &str,
        version_id: &str,
    ) -> Result<CryptoKey, GcpError>;
    /// Cancel a scheduled destruction; the version comes back DISABLED
    async fn restore_crypto_key_version(&self, name: &str) -> Result<CryptoKeyVersion, GcpError>;

    async fn get_iam_policy(&self, resource: &str) -> Result<Policy, GcpError>;
    async fn set_iam_policy(&self, resource: &str, policy: &Policy) -> Result<Policy, GcpError>;
}

/// GKE cluster manager
///
/// Resource arguments are `projects/*/locations/*/clusters/*` names, and
/// `parent` is `projects/*/locations/*`.
#[async_trait::async_trait]
pub trait ClusterManagerClientTrait: Send + Sync {
    async fn get_cluster(&self, name: &str) -> Result<Cluster, GcpError>;
    async fn create_cluster(&self, parent: &str, cluster: &Cluster) -> Result<ContainerOperation, GcpError>;
    async fn update_cluster(&self, name: &str, update: &ClusterUpdate) -> Result<ContainerOperation, GcpError>;
    async fn update_node_pool(&self, request: &UpdateNodePoolRequest) -> Result<ContainerOperation, GcpError>;
    async fn delete_cluster(&self, name: &str) -> Result<ContainerOperation, GcpError>;
    /// `name`: `projects/*/locations/*/operations/*`
    async fn get_operation(&self, name: &str) -> Result<ContainerOperation, GcpError>;
}

/// Cloud Resource Manager project lookup
#[async_trait::async_trait]
pub trait ProjectsClientTrait: Send + Sync {
    async fn get_project(&self, project_id: &str) -> Result<Project, GcpError>;
}

/// Service Usage API enablement
#[async_trait::async_trait]
pub trait ServiceUsageClientTrait: Send + Sync {
    /// `parent`: `projects/{project_number_or_id}`; `services` are service names like `compute.googleapis.com`
    async fn batch_enable_services(
        &self,
        parent: &str,
        services: &[String],
    ) -> Result<LongRunningOperation, GcpError>;
    /// `name`: `operations/*`
    async fn get_service_operation(&self, name: &str) -> Result<LongRunningOperation, GcpError>;
}
