//! Controlplane orchestrator
//!
//! Sequences the resource primitives through the dependency graph:
//!
//! ```text
//! Network ─┬─ Subnetwork ──────────────┐
//!          ├─ Router (NAT)             ├─ Cluster
//!          │   KeyRing ─ CryptoKey ────┘
//!          └─ Firewalls
//! ```
//!
//! - Create walks the graph forward, threading each produced identifier into
//!   the primitives that need it. It stops at the first failure and never
//!   rolls back; re-running converges because every create is get-or-create.
//! - Update walks the same order. Structural kinds only check presence; the
//!   crypto key grant and the cluster configuration are re-applied.
//! - Delete walks it in reverse. The key ring is never deleted and the crypto
//!   key only loses its grant.
//!
//! The firewalls have no ordering between them and are applied concurrently.

use crate::config::ControlplaneConfig;
use crate::error::ControllerError;
use crate::key_version::{KeyVersionSettings, KeyVersionStateMachine};
use crate::poller::OperationPoller;
use crate::project;
use crate::reconciler::compute::{FirewallResource, NetworkResource, RouterResource, SubnetworkResource};
use crate::reconciler::container::ClusterResource;
use crate::reconciler::kms::{CryptoKeyResource, KeyRingResource};
use crate::reconciler::{CryptoKeyRef, KeyRingRef, NetworkRef, ProvisionedResource, SubnetworkRef};
use crds::{ControlplanePhase, ControlplaneStatus};
use futures::future::try_join_all;
use gcp_client::{Cluster, CryptoKey, Firewall, GcpClients, KeyRing, Network, Router, Subnetwork};
use std::fmt;
use tracing::{error, info};

/// Which forward operation a pass performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Create,
    Update,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Create => f.write_str("create"),
            Pass::Update => f.write_str("update"),
        }
    }
}

/// Run one primitive for `pass`, logging which stage failed
async fn apply<R: ProvisionedResource>(resource: &R, pass: Pass) -> Result<R::Output, ControllerError> {
    let result = match pass {
        Pass::Create => resource.create().await,
        Pass::Update => resource.update().await,
    }
    .map_err(ControllerError::surfaced);
    if let Err(e) = &result {
        error!("Failed to {} {} {}: {}", pass, resource.kind(), resource.name(), e);
    }
    result
}

async fn remove<R: ProvisionedResource>(resource: &R) -> Result<(), ControllerError> {
    let result = resource.delete().await.map_err(ControllerError::surfaced);
    if let Err(e) = &result {
        error!("Failed to delete {} {}: {}", resource.kind(), resource.name(), e);
    }
    result
}

/// Everything a forward pass produced
#[derive(Debug, Clone)]
pub struct ProvisionedControlplane {
    pub network: Network,
    pub subnetwork: Subnetwork,
    pub router: Router,
    pub key_ring: KeyRing,
    pub crypto_key: CryptoKey,
    pub cluster: Cluster,
    pub firewalls: Vec<Firewall>,
    pub service_agent: String,
}

impl ProvisionedControlplane {
    /// Status block written back into the manifest
    pub fn status(&self) -> ControlplaneStatus {
        ControlplaneStatus {
            phase: ControlplanePhase::Ready,
            network_self_link: self.network.self_link.clone(),
            subnetwork_self_link: self.subnetwork.self_link.clone(),
            router_self_link: self.router.self_link.clone(),
            key_ring: Some(self.key_ring.name.clone()),
            crypto_key: Some(self.crypto_key.name.clone()),
            primary_key_version: self
                .crypto_key
                .primary
                .as_ref()
                .map(|v| format!("{} ({})", v.version_id(), v.state)),
            cluster_self_link: self.cluster.self_link.clone(),
            firewall_self_links: self.firewalls.iter().filter_map(|f| f.self_link.clone()).collect(),
            service_agent: Some(self.service_agent.clone()),
            last_applied: Some(chrono::Utc::now()),
        }
    }
}

/// Drives a controlplane through create, update and delete
#[derive(Debug, Clone)]
pub struct ControlplaneController {
    clients: GcpClients,
    poller: OperationPoller,
    key_version_settings: KeyVersionSettings,
}

impl ControlplaneController {
    pub fn new(clients: GcpClients, poller: OperationPoller, key_version_settings: KeyVersionSettings) -> Self {
        Self {
            clients,
            poller,
            key_version_settings,
        }
    }

    /// Numeric project number, needed to name the GKE service agent
    pub async fn project_number(&self, project_id: &str) -> Result<String, ControllerError> {
        project::resolve_project_number(self.clients.projects.as_ref(), &self.poller, project_id).await
    }

    /// Enable the APIs the controlplane depends on
    pub async fn enable_apis(&self, project_id: &str) -> Result<(), ControllerError> {
        project::enable_required_apis(self.clients.service_usage.as_ref(), &self.poller, project_id).await
    }

    pub async fn create(&self, config: &ControlplaneConfig) -> Result<ProvisionedControlplane, ControllerError> {
        info!("Creating controlplane {} in {}/{}", config.name, config.project_id, config.region);
        let provisioned = self.forward(config, Pass::Create).await?;
        info!("✅ Controlplane {} created", config.name);
        Ok(provisioned)
    }

    pub async fn update(&self, config: &ControlplaneConfig) -> Result<ProvisionedControlplane, ControllerError> {
        info!("Updating controlplane {} in {}/{}", config.name, config.project_id, config.region);
        let provisioned = self.forward(config, Pass::Update).await?;
        info!("✅ Controlplane {} updated", config.name);
        Ok(provisioned)
    }

    pub async fn delete(&self, config: &ControlplaneConfig) -> Result<(), ControllerError> {
        info!("Deleting controlplane {} in {}/{}", config.name, config.project_id, config.region);

        // Nothing is created on this path, so references are derived from names
        let network = NetworkRef::derived(&config.project_id, &config.network.name);
        let subnetwork =
            SubnetworkRef::derived(&config.project_id, &config.subnetwork.region, &config.subnetwork.name);
        let key_ring = KeyRingRef {
            name: config.key_ring.full_name(),
        };
        let crypto_key = CryptoKeyRef {
            name: format!("{}/cryptoKeys/{}", key_ring.name, config.crypto_key.name),
        };

        let firewalls = self.firewalls(config, &network);
        try_join_all(firewalls.iter().map(remove)).await?;
        remove(&self.cluster(config, &network, &subnetwork, &crypto_key)).await?;
        remove(&self.crypto_key(config, &key_ring)).await?;
        remove(&self.key_ring(config)).await?;
        remove(&self.router(config, &network)).await?;
        remove(&self.subnetwork(config, &network)).await?;
        remove(&self.network(config)).await?;

        info!("✅ Controlplane {} deleted", config.name);
        Ok(())
    }

    async fn forward(&self, config: &ControlplaneConfig, pass: Pass) -> Result<ProvisionedControlplane, ControllerError> {
        let network = apply(&self.network(config), pass).await?;
        let network_ref = NetworkResource::reference(&network)?;

        let subnetwork = apply(&self.subnetwork(config, &network_ref), pass).await?;
        let subnetwork_ref = SubnetworkResource::reference(&subnetwork)?;

        let router = apply(&self.router(config, &network_ref), pass).await?;

        let key_ring = apply(&self.key_ring(config), pass).await?;
        let key_ring_ref = KeyRingResource::reference(&key_ring);

        let crypto_key = apply(&self.crypto_key(config, &key_ring_ref), pass).await?;
        let crypto_key_ref = CryptoKeyResource::reference(&crypto_key);

        let cluster = apply(
            &self.cluster(config, &network_ref, &subnetwork_ref, &crypto_key_ref),
            pass,
        )
        .await?;

        let firewall_resources = self.firewalls(config, &network_ref);
        let firewalls = try_join_all(firewall_resources.iter().map(|f| apply(f, pass))).await?;

        Ok(ProvisionedControlplane {
            network,
            subnetwork,
            router,
            key_ring,
            crypto_key,
            cluster,
            firewalls,
            service_agent: config.crypto_key.service_agent.clone(),
        })
    }

    fn network(&self, config: &ControlplaneConfig) -> NetworkResource {
        NetworkResource::new(config.network.clone(), self.clients.networks.clone(), self.poller.clone())
    }

    fn subnetwork(&self, config: &ControlplaneConfig, network: &NetworkRef) -> SubnetworkResource {
        SubnetworkResource::new(
            config.subnetwork.clone(),
            network.clone(),
            self.clients.subnetworks.clone(),
            self.poller.clone(),
        )
    }

    fn router(&self, config: &ControlplaneConfig, network: &NetworkRef) -> RouterResource {
        RouterResource::new(
            config.router.clone(),
            network.clone(),
            self.clients.routers.clone(),
            self.poller.clone(),
        )
    }

    fn key_ring(&self, config: &ControlplaneConfig) -> KeyRingResource {
        KeyRingResource::new(config.key_ring.clone(), self.clients.kms.clone(), self.poller.clone())
    }

    fn crypto_key(&self, config: &ControlplaneConfig, key_ring: &KeyRingRef) -> CryptoKeyResource {
        CryptoKeyResource::new(
            config.crypto_key.clone(),
            key_ring.clone(),
            self.clients.kms.clone(),
            self.poller.clone(),
            KeyVersionStateMachine::new(self.clients.kms.clone(), self.poller.clone(), self.key_version_settings),
        )
    }

    fn cluster(
        &self,
        config: &ControlplaneConfig,
        network: &NetworkRef,
        subnetwork: &SubnetworkRef,
        crypto_key: &CryptoKeyRef,
    ) -> ClusterResource {
        ClusterResource::new(
            config.cluster.clone(),
            network.clone(),
            subnetwork.clone(),
            crypto_key.clone(),
            self.clients.clusters.clone(),
            self.poller.clone(),
        )
    }

    fn firewalls(&self, config: &ControlplaneConfig, network: &NetworkRef) -> Vec<FirewallResource> {
        config
            .firewalls
            .iter()
            .map(|spec| {
                FirewallResource::new(
                    spec.clone(),
                    network.clone(),
                    self.clients.firewalls.clone(),
                    self.poller.clone(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;
