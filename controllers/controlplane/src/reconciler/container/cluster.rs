//! GKE Cluster reconciler
//!
//! The cluster is private (nodes without external addresses), encrypts
//! secrets with the controlplane crypto key and runs a single autoscaled
//! `default-pool`. Update re-asserts the security-relevant configuration in
//! two stages: a cluster-level update, then a node pool update. Each stage is
//! polled to DONE before the next starts.

use crate::config::{ClusterSpec, DEFAULT_NODE_POOL, PODS_RANGE_NAME, SERVICES_RANGE_NAME};
use crate::error::ControllerError;
use crate::poller::OperationPoller;
use crate::reconcile_helpers::{check_existing, require_existing, require_field};
use crate::reconciler::{CryptoKeyRef, NetworkRef, ProvisionedResource, SubnetworkRef};
use async_trait::async_trait;
use gcp_client::{
    AddonsConfig, Cluster, ClusterManagerClientTrait, ClusterUpdate, ContainerOperation, DailyMaintenanceWindow,
    DatabaseEncryption, DisabledFlag, EnabledFlag, IpAllocationPolicy, MaintenancePolicy, MaintenanceWindow,
    MasterAuthorizedNetworksConfig, NetworkConfig, NetworkTags, NodeConfig, NodeManagement, NodePool,
    NodePoolAutoscaling, PrivateClusterConfig, ReleaseChannel, ShieldedInstanceConfig, UpdateNodePoolRequest,
    UpgradeSettings, WorkloadIdentityConfig, WorkloadMetadataConfig,
};
use std::sync::Arc;
use tracing::{info, warn};

const OAUTH_SCOPES: [&str; 7] = [
    "https://www.googleapis.com/auth/devstorage.read_only",
    "https://www.googleapis.com/auth/logging.write",
    "https://www.googleapis.com/auth/monitoring",
    "https://www.googleapis.com/auth/servicecontrol",
    "https://www.googleapis.com/auth/service.management.readonly",
    "https://www.googleapis.com/auth/trace.append",
    "https://www.googleapis.com/auth/cloud-platform",
];
const DISK_TYPE: &str = "pd-ssd";
const WORKLOAD_METADATA_MODE: &str = "GKE_METADATA";
const RELEASE_CHANNEL: &str = "REGULAR";
const MAINTENANCE_START: &str = "06:00";
const FALLBACK_IMAGE_TYPE: &str = "COS_CONTAINERD";
/// Keep the current node version when updating the pool
const CURRENT_NODE_VERSION: &str = "-";

pub struct ClusterResource {
    spec: ClusterSpec,
    network: NetworkRef,
    subnetwork: SubnetworkRef,
    crypto_key: CryptoKeyRef,
    client: Arc<dyn ClusterManagerClientTrait>,
    poller: OperationPoller,
}

impl ClusterResource {
    pub fn new(
        spec: ClusterSpec,
        network: NetworkRef,
        subnetwork: SubnetworkRef,
        crypto_key: CryptoKeyRef,
        client: Arc<dyn ClusterManagerClientTrait>,
        poller: OperationPoller,
    ) -> Self {
        Self {
            spec,
            network,
            subnetwork,
            crypto_key,
            client,
            poller,
        }
    }

    fn addons() -> AddonsConfig {
        AddonsConfig {
            http_load_balancing: Some(DisabledFlag { disabled: false }),
            horizontal_pod_autoscaling: Some(DisabledFlag { disabled: false }),
            config_connector_config: Some(EnabledFlag { enabled: true }),
            gce_persistent_disk_csi_driver_config: Some(EnabledFlag { enabled: true }),
            gcp_filestore_csi_driver_config: Some(EnabledFlag { enabled: true }),
        }
    }

    fn autoscaling(&self) -> NodePoolAutoscaling {
        NodePoolAutoscaling {
            enabled: true,
            min_node_count: self.spec.min_node_count,
            max_node_count: self.spec.max_node_count,
        }
    }

    fn authorized_networks(&self) -> MasterAuthorizedNetworksConfig {
        MasterAuthorizedNetworksConfig {
            enabled: true,
            cidr_blocks: self.spec.master_authorized_networks.clone(),
        }
    }

    fn private_cluster(&self) -> PrivateClusterConfig {
        PrivateClusterConfig {
            enable_private_nodes: true,
            master_ipv4_cidr_block: self.spec.master_cidr_block.clone(),
        }
    }

    fn upgrade_settings() -> UpgradeSettings {
        UpgradeSettings {
            max_surge: 1,
            max_unavailable: 1,
        }
    }

    fn workload_metadata() -> WorkloadMetadataConfig {
        WorkloadMetadataConfig {
            mode: WORKLOAD_METADATA_MODE.to_string(),
        }
    }

    fn release_channel() -> ReleaseChannel {
        ReleaseChannel {
            channel: RELEASE_CHANNEL.to_string(),
        }
    }

    fn default_pool(&self) -> NodePool {
        NodePool {
            name: DEFAULT_NODE_POOL.to_string(),
            config: Some(NodeConfig {
                machine_type: self.spec.machine_type.clone(),
                disk_size_gb: self.spec.disk_size_gb,
                disk_type: Some(DISK_TYPE.to_string()),
                image_type: None,
                oauth_scopes: OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
                tags: vec![DEFAULT_NODE_POOL.to_string()],
                workload_metadata_config: Some(Self::workload_metadata()),
                shielded_instance_config: Some(ShieldedInstanceConfig {
                    enable_secure_boot: true,
                    enable_integrity_monitoring: false,
                }),
            }),
            initial_node_count: 1,
            autoscaling: Some(self.autoscaling()),
            management: Some(NodeManagement {
                auto_upgrade: true,
                auto_repair: true,
            }),
            upgrade_settings: Some(Self::upgrade_settings()),
            status: None,
        }
    }

    fn desired(&self) -> Cluster {
        Cluster {
            name: self.spec.name.clone(),
            network: self.network.name.clone(),
            subnetwork: self.subnetwork.name.clone(),
            addons_config: Some(Self::addons()),
            database_encryption: Some(DatabaseEncryption {
                state: "ENCRYPTED".to_string(),
                key_name: self.crypto_key.name.clone(),
            }),
            node_pools: vec![self.default_pool()],
            ip_allocation_policy: Some(IpAllocationPolicy {
                use_ip_aliases: true,
                cluster_secondary_range_name: Some(PODS_RANGE_NAME.to_string()),
                services_secondary_range_name: Some(SERVICES_RANGE_NAME.to_string()),
            }),
            master_authorized_networks_config: Some(self.authorized_networks()),
            maintenance_policy: Some(MaintenancePolicy {
                window: Some(MaintenanceWindow {
                    daily_maintenance_window: Some(DailyMaintenanceWindow {
                        start_time: MAINTENANCE_START.to_string(),
                    }),
                }),
            }),
            binary_authorization: Some(EnabledFlag { enabled: true }),
            network_config: Some(NetworkConfig {
                enable_intra_node_visibility: true,
            }),
            private_cluster_config: Some(self.private_cluster()),
            shielded_nodes: Some(EnabledFlag { enabled: true }),
            release_channel: Some(Self::release_channel()),
            workload_identity_config: Some(WorkloadIdentityConfig {
                workload_pool: self.spec.workload_pool(),
            }),
            ..Default::default()
        }
    }

    fn desired_update(&self) -> ClusterUpdate {
        ClusterUpdate {
            desired_addons_config: Some(Self::addons()),
            desired_node_pool_id: Some(DEFAULT_NODE_POOL.to_string()),
            desired_node_pool_autoscaling: Some(self.autoscaling()),
            desired_master_authorized_networks_config: Some(self.authorized_networks()),
            desired_binary_authorization: Some(EnabledFlag { enabled: true }),
            desired_intra_node_visibility_config: Some(EnabledFlag { enabled: true }),
            desired_release_channel: Some(Self::release_channel()),
            desired_private_cluster_config: Some(self.private_cluster()),
            desired_shielded_nodes: Some(EnabledFlag { enabled: true }),
        }
    }

    /// Node pool patch; the image type is carried over from the live pool
    fn node_pool_update(&self, live: &Cluster) -> UpdateNodePoolRequest {
        let image_type = live
            .node_pools
            .iter()
            .find(|p| p.name == DEFAULT_NODE_POOL)
            .and_then(|p| p.config.as_ref())
            .and_then(|c| c.image_type.clone())
            .unwrap_or_else(|| {
                warn!(
                    "Cluster {} reports no image type for {}, using {}",
                    self.spec.name, DEFAULT_NODE_POOL, FALLBACK_IMAGE_TYPE
                );
                FALLBACK_IMAGE_TYPE.to_string()
            });

        UpdateNodePoolRequest {
            name: format!("{}/nodePools/{}", self.spec.full_name(), DEFAULT_NODE_POOL),
            node_version: CURRENT_NODE_VERSION.to_string(),
            image_type,
            workload_metadata_config: Some(Self::workload_metadata()),
            upgrade_settings: Some(Self::upgrade_settings()),
            tags: Some(NetworkTags {
                tags: vec![DEFAULT_NODE_POOL.to_string()],
            }),
        }
    }

    async fn wait(&self, op: ContainerOperation) -> Result<(), ControllerError> {
        let op_name = format!("{}/operations/{}", self.spec.parent(), op.name);
        self.poller.wait(op, || self.client.get_operation(&op_name)).await?;
        Ok(())
    }
}

#[async_trait]
impl ProvisionedResource for ClusterResource {
    type Output = Cluster;

    fn kind(&self) -> &'static str {
        "Cluster"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self) -> Result<(), ControllerError> {
        require_field(self.kind(), "name", &self.spec.name)?;
        require_field(self.kind(), "project", &self.spec.project)?;
        require_field(self.kind(), "region", &self.spec.region)?;
        require_field(self.kind(), "masterCidrBlock", &self.spec.master_cidr_block)
    }

    async fn get(&self) -> Result<Cluster, ControllerError> {
        self.poller
            .lookup(self.client.get_cluster(&self.spec.full_name()))
            .await
    }

    async fn create(&self) -> Result<Cluster, ControllerError> {
        self.validate()?;
        require_field(self.kind(), "network", &self.network.name)?;
        require_field(self.kind(), "subnetwork", &self.subnetwork.name)?;
        require_field(self.kind(), "cryptoKey", &self.crypto_key.name)?;
        if let Some(existing) = check_existing(self.kind(), self.name(), self.get()).await? {
            info!("Cluster {} already exists", self.spec.name);
            return Ok(existing);
        }

        info!(
            "Creating cluster {} in {} (this takes several minutes)",
            self.spec.name, self.spec.region
        );
        let op = self
            .poller
            .request(self.client.create_cluster(&self.spec.parent(), &self.desired()))
            .await?;
        self.wait(op).await?;

        let cluster = self.get().await?;
        info!("Created cluster {}", self.spec.name);
        Ok(cluster)
    }

    async fn update(&self) -> Result<Cluster, ControllerError> {
        self.validate()?;
        require_existing(self.kind(), self.name(), self.get()).await?;

        info!("Updating cluster {}", self.spec.name);
        let op = self
            .poller
            .request(
                self.client
                    .update_cluster(&self.spec.full_name(), &self.desired_update()),
            )
            .await?;
        self.wait(op).await?;

        let live = self.get().await?;
        info!("Updating node pool {} of {}", DEFAULT_NODE_POOL, self.spec.name);
        let op = self
            .poller
            .request(self.client.update_node_pool(&self.node_pool_update(&live)))
            .await?;
        self.wait(op).await?;

        let cluster = self.get().await?;
        info!("Updated cluster {}", self.spec.name);
        Ok(cluster)
    }

    async fn delete(&self) -> Result<(), ControllerError> {
        self.validate()?;
        if check_existing(self.kind(), self.name(), self.get()).await?.is_none() {
            info!("Cluster {} already absent", self.spec.name);
            return Ok(());
        }

        info!("Deleting cluster {}", self.spec.name);
        let op = self
            .poller
            .request(self.client.delete_cluster(&self.spec.full_name()))
            .await?;
        self.wait(op).await?;
        info!("Deleted cluster {}", self.spec.name);
        Ok(())
    }
}
