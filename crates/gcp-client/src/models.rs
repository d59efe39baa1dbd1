//! Google Cloud API models
//!
//! These models match the JSON representation of the public REST APIs
//! (compute v1, cloudkms v1, container v1, cloudresourcemanager v3, serviceusage v1).
//! Only the fields the provisioner reads or writes are modelled.

use serde::{Deserialize, Serialize};

/// `google.rpc.Status`, used as the error payload of KMS/GKE/LRO responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Compute Engine
// ---------------------------------------------------------------------------

/// VPC network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_subnetworks: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnetworks: Vec<String>,
}

/// Secondary range on a subnetwork (used for GKE pods and services)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryIpRange {
    pub range_name: String,
    pub ip_cidr_range: String,
}

/// Regional subnetwork
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnetwork {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Network self-link
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub ip_cidr_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip_google_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_ip_ranges: Vec<SecondaryIpRange>,
}

/// Cloud NAT configuration attached to a router
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterNat {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_ip_allocate_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_subnetwork_ip_ranges_to_nat: Option<String>,
}

/// Cloud Router
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Router {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Network self-link
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nats: Vec<RouterNat>,
}

/// One allowed protocol/ports entry of a firewall rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

/// Firewall direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirewallDirection {
    #[default]
    Ingress,
    Egress,
}

impl std::fmt::Display for FirewallDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirewallDirection::Ingress => write!(f, "INGRESS"),
            FirewallDirection::Egress => write!(f, "EGRESS"),
        }
    }
}

/// VPC firewall rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Network self-link
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub direction: FirewallDirection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<FirewallRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_tags: Vec<String>,
}

/// Compute operation status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputeOperationStatus {
    #[default]
    Pending,
    Running,
    Done,
}

/// One entry of a compute operation error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperationErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Error payload of a compute operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperationError {
    #[serde(default)]
    pub errors: Vec<ComputeOperationErrorItem>,
}

/// Global or regional compute operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperation {
    pub name: String,
    #[serde(default)]
    pub status: ComputeOperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    /// Region URL for regional operations, absent for global ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ComputeOperationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Cloud KMS
// ---------------------------------------------------------------------------

/// KMS key ring. Key rings cannot be deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRing {
    /// Full resource name: `projects/*/locations/*/keyRings/*`
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

/// CryptoKey purpose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoKeyPurpose {
    #[default]
    EncryptDecrypt,
    AsymmetricSign,
    AsymmetricDecrypt,
    Mac,
    #[serde(other)]
    Unspecified,
}

/// CryptoKeyVersion state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoKeyVersionState {
    PendingGeneration,
    #[default]
    Enabled,
    Disabled,
    Destroyed,
    DestroyScheduled,
    #[serde(other)]
    Unspecified,
}

impl std::fmt::Display for CryptoKeyVersionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CryptoKeyVersionState::PendingGeneration => "PENDING_GENERATION",
            CryptoKeyVersionState::Enabled => "ENABLED",
            CryptoKeyVersionState::Disabled => "DISABLED",
            CryptoKeyVersionState::Destroyed => "DESTROYED",
            CryptoKeyVersionState::DestroyScheduled => "DESTROY_SCHEDULED",
            CryptoKeyVersionState::Unspecified => "CRYPTO_KEY_VERSION_STATE_UNSPECIFIED",
        };
        f.write_str(s)
    }
}

/// Cryptographic material behind a CryptoKey
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersion {
    /// Full resource name: `.../cryptoKeys/*/cryptoKeyVersions/*`
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: CryptoKeyVersionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy_time: Option<String>,
}

impl CryptoKeyVersion {
    /// The trailing version id (`3` for `.../cryptoKeyVersions/3`)
    pub fn version_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// KMS CryptoKey
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKey {
    /// Full resource name: `projects/*/locations/*/keyRings/*/cryptoKeys/*`
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub purpose: CryptoKeyPurpose,
    /// Primary version; only present for ENCRYPT_DECRYPT keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<CryptoKeyVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

/// IAM role binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    /// IAM condition, kept opaque so a read-modify-write round-trips it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

/// IAM policy attached to a KMS resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Base64 etag used for optimistic concurrency on setIamPolicy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Policy version that carries conditional bindings
pub const IAM_POLICY_VERSION: i32 = 3;

impl Policy {
    /// Grant `role` to `member`. Returns false if the member already had it.
    ///
    /// Only the unconditional binding for `role` is touched.
    pub fn add_member(&mut self, role: &str, member: &str) -> bool {
        match self
            .bindings
            .iter_mut()
            .find(|b| b.role == role && b.condition.is_none())
        {
            Some(binding) => {
                if binding.members.iter().any(|m| m == member) {
                    false
                } else {
                    binding.members.push(member.to_string());
                    true
                }
            }
            None => {
                self.bindings.push(Binding {
                    role: role.to_string(),
                    members: vec![member.to_string()],
                    condition: None,
                });
                true
            }
        }
    }

    /// Revoke `role` from `member`, dropping the binding once it has no members.
    /// Returns false if the member did not have the role.
    ///
    /// Conditional bindings are left as they are.
    pub fn remove_member(&mut self, role: &str, member: &str) -> bool {
        let mut removed = false;
        for binding in self
            .bindings
            .iter_mut()
            .filter(|b| b.role == role && b.condition.is_none())
        {
            let before = binding.members.len();
            binding.members.retain(|m| m != member);
            removed |= binding.members.len() != before;
        }
        self.bindings.retain(|b| !b.members.is_empty());
        removed
    }

    /// True if `member` holds `role` unconditionally
    pub fn has_member(&self, role: &str, member: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.role == role && b.condition.is_none() && b.members.iter().any(|m| m == member))
    }
}

// ---------------------------------------------------------------------------
// Kubernetes Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisabledFlag {
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledFlag {
    #[serde(default)]
    pub enabled: bool,
}

/// Cluster addons
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_load_balancing: Option<DisabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_pod_autoscaling: Option<DisabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_connector_config: Option<EnabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gce_persistent_disk_csi_driver_config: Option<EnabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_filestore_csi_driver_config: Option<EnabledFlag>,
}

/// Application-layer secrets encryption
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEncryption {
    /// `ENCRYPTED` or `DECRYPTED`
    pub state: String,
    #[serde(default)]
    pub key_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadMetadataConfig {
    /// `GKE_METADATA` or `GCE_METADATA`
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldedInstanceConfig {
    #[serde(default)]
    pub enable_secure_boot: bool,
    #[serde(default)]
    pub enable_integrity_monitoring: bool,
}

/// Node VM configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default)]
    pub machine_type: String,
    #[serde(default)]
    pub disk_size_gb: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oauth_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_metadata_config: Option<WorkloadMetadataConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shielded_instance_config: Option<ShieldedInstanceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolAutoscaling {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min_node_count: i32,
    #[serde(default)]
    pub max_node_count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeManagement {
    #[serde(default)]
    pub auto_upgrade: bool,
    #[serde(default)]
    pub auto_repair: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSettings {
    #[serde(default)]
    pub max_surge: i32,
    #[serde(default)]
    pub max_unavailable: i32,
}

/// GKE node pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NodeConfig>,
    #[serde(default)]
    pub initial_node_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<NodePoolAutoscaling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management: Option<NodeManagement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_settings: Option<UpgradeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAllocationPolicy {
    #[serde(default)]
    pub use_ip_aliases: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_secondary_range_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_secondary_range_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CidrBlock {
    #[serde(default)]
    pub display_name: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterAuthorizedNetworksConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cidr_blocks: Vec<CidrBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMaintenanceWindow {
    /// `HH:MM` in UTC
    pub start_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_maintenance_window: Option<DailyMaintenanceWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<MaintenanceWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default)]
    pub enable_intra_node_visibility: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateClusterConfig {
    #[serde(default)]
    pub enable_private_nodes: bool,
    #[serde(default)]
    pub master_ipv4_cidr_block: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseChannel {
    /// `RAPID`, `REGULAR`, `STABLE`
    pub channel: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadIdentityConfig {
    pub workload_pool: String,
}

/// GKE cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub subnetwork: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons_config: Option<AddonsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_encryption: Option<DatabaseEncryption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_pools: Vec<NodePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_allocation_policy: Option<IpAllocationPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_authorized_networks_config: Option<MasterAuthorizedNetworksConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_policy: Option<MaintenancePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_authorization: Option<EnabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_cluster_config: Option<PrivateClusterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shielded_nodes: Option<EnabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_channel: Option<ReleaseChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_identity_config: Option<WorkloadIdentityConfig>,
}

/// Desired-state patch for `projects.locations.clusters.update`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_addons_config: Option<AddonsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_node_pool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_node_pool_autoscaling: Option<NodePoolAutoscaling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_master_authorized_networks_config: Option<MasterAuthorizedNetworksConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_binary_authorization: Option<EnabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_intra_node_visibility_config: Option<EnabledFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_release_channel: Option<ReleaseChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_private_cluster_config: Option<PrivateClusterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_shielded_nodes: Option<EnabledFlag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTags {
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `projects.locations.clusters.nodePools.update`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodePoolRequest {
    /// `projects/*/locations/*/clusters/*/nodePools/*`
    pub name: String,
    pub node_version: String,
    pub image_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_metadata_config: Option<WorkloadMetadataConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_settings: Option<UpgradeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<NetworkTags>,
}

/// GKE operation status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerOperationStatus {
    #[default]
    StatusUnspecified,
    Pending,
    Running,
    Done,
    Aborting,
}

/// GKE operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOperation {
    /// Short operation id (`operation-1234-abcd`)
    pub name: String,
    #[serde(default)]
    pub status: ContainerOperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
}

// ---------------------------------------------------------------------------
// Resource Manager / Service Usage
// ---------------------------------------------------------------------------

/// Cloud Resource Manager v3 project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// `projects/{project_number}`
    pub name: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Project {
    /// Numeric project number parsed from `name`
    pub fn project_number(&self) -> Option<&str> {
        self.name
            .strip_prefix("projects/")
            .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    }
}

/// `google.longrunning.Operation`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongRunningOperation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBER: &str = "serviceAccount:service-123@container-engine-robot.iam.gserviceaccount.com";

    #[test]
    fn test_policy_add_member_is_idempotent() {
        let mut policy = Policy::default();
        assert!(policy.add_member("roles/cloudkms.cryptoKeyEncrypter", MEMBER));
        assert!(!policy.add_member("roles/cloudkms.cryptoKeyEncrypter", MEMBER));
        assert_eq!(policy.bindings.len(), 1);
        assert_eq!(policy.bindings[0].members, vec![MEMBER.to_string()]);
    }

    #[test]
    fn test_policy_remove_member_drops_empty_binding() {
        let mut policy = Policy::default();
        policy.add_member("roles/cloudkms.cryptoKeyDecrypter", MEMBER);
        policy.add_member("roles/cloudkms.cryptoKeyDecrypter", "user:ops@example.com");
        policy.add_member("roles/cloudkms.cryptoKeyEncrypter", MEMBER);

        assert!(policy.remove_member("roles/cloudkms.cryptoKeyEncrypter", MEMBER));
        assert!(policy.remove_member("roles/cloudkms.cryptoKeyDecrypter", MEMBER));
        assert!(!policy.remove_member("roles/cloudkms.cryptoKeyDecrypter", MEMBER));

        assert_eq!(policy.bindings.len(), 1);
        assert!(policy.has_member("roles/cloudkms.cryptoKeyDecrypter", "user:ops@example.com"));
    }

    #[test]
    fn test_policy_keeps_conditional_bindings() {
        let mut policy: Policy = serde_json::from_str(
            r#"{
                "version": 3,
                "etag": "BwY=",
                "bindings": [{
                    "role": "roles/cloudkms.cryptoKeyEncrypter",
                    "members": ["group:break-glass@example.com"],
                    "condition": {"title": "expires", "expression": "request.time < timestamp('2027-01-01T00:00:00Z')"}
                }]
            }"#,
        )
        .unwrap();

        assert!(!policy.has_member("roles/cloudkms.cryptoKeyEncrypter", "group:break-glass@example.com"));
        assert!(policy.add_member("roles/cloudkms.cryptoKeyEncrypter", MEMBER));
        assert!(!policy.remove_member("roles/cloudkms.cryptoKeyEncrypter", "group:break-glass@example.com"));

        // The grant lands in a separate unconditional binding
        assert_eq!(policy.bindings.len(), 2);
        assert_eq!(policy.bindings[0].members, vec!["group:break-glass@example.com".to_string()]);
        assert!(policy.bindings[1].condition.is_none());

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["version"], IAM_POLICY_VERSION);
        assert_eq!(json["bindings"][0]["condition"]["title"], "expires");
        assert!(json["bindings"][1].get("condition").is_none());
    }

    #[test]
    fn test_firewall_rule_uses_ip_protocol_key() {
        let rule = FirewallRule {
            ip_protocol: "tcp".to_string(),
            ports: vec!["8443".to_string()],
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["IPProtocol"], "tcp");
        assert_eq!(json["ports"][0], "8443");
    }

    #[test]
    fn test_unknown_key_version_state_is_unspecified() {
        let version: CryptoKeyVersion = serde_json::from_str(
            r#"{"name": "projects/p/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/4", "state": "PENDING_IMPORT"}"#,
        )
        .unwrap();
        assert_eq!(version.state, CryptoKeyVersionState::Unspecified);
        assert_eq!(version.version_id(), "4");
    }

    #[test]
    fn test_project_number_parsing() {
        let project = Project {
            name: "projects/123456789".to_string(),
            project_id: "demo-project".to_string(),
            ..Default::default()
        };
        assert_eq!(project.project_number(), Some("123456789"));

        let bogus = Project {
            name: "projects/demo-project".to_string(),
            ..Default::default()
        };
        assert_eq!(bogus.project_number(), None);
    }
}
