//! Capability client bundle handed to the provisioner

use crate::gcp_trait::*;
use std::sync::Arc;

/// One client per provider capability.
///
/// The slots are independent so a test can swap a single capability, but in
/// practice they all point at the same `GcpClient` (or `MockGcpClient`).
#[derive(Clone)]
pub struct GcpClients {
    pub networks: Arc<dyn NetworksClientTrait>,
    pub subnetworks: Arc<dyn SubnetworksClientTrait>,
    pub routers: Arc<dyn RoutersClientTrait>,
    pub firewalls: Arc<dyn FirewallsClientTrait>,
    pub kms: Arc<dyn KmsClientTrait>,
    pub clusters: Arc<dyn ClusterManagerClientTrait>,
    pub projects: Arc<dyn ProjectsClientTrait>,
    pub service_usage: Arc<dyn ServiceUsageClientTrait>,
}

impl std::fmt::Debug for GcpClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpClients").finish_non_exhaustive()
    }
}

impl GcpClients {
    /// Share one implementation across every capability slot
    pub fn from_client<C>(client: C) -> Self
    where
        C: NetworksClientTrait
            + SubnetworksClientTrait
            + RoutersClientTrait
            + FirewallsClientTrait
            + KmsClientTrait
            + ClusterManagerClientTrait
            + ProjectsClientTrait
            + ServiceUsageClientTrait
            + 'static,
    {
        let client = Arc::new(client);
        Self {
            networks: client.clone(),
            subnetworks: client.clone(),
            routers: client.clone(),
            firewalls: client.clone(),
            kms: client.clone(),
            clusters: client.clone(),
            projects: client.clone(),
            service_usage: client,
        }
    }
}
