//! Network reconciler

use crate::config::NetworkSpec;
use crate::error::ControllerError;
use crate::poller::OperationPoller;
use crate::reconcile_helpers::{check_existing, require_existing, require_field};
use crate::reconciler::{NetworkRef, ProvisionedResource, self_link_of};
use async_trait::async_trait;
use gcp_client::{ComputeOperationsClientTrait, Network, NetworksClientTrait};
use std::sync::Arc;
use tracing::info;

/// Custom-mode VPC network
pub struct NetworkResource {
    spec: NetworkSpec,
    client: Arc<dyn NetworksClientTrait>,
    poller: OperationPoller,
}

impl NetworkResource {
    pub fn new(spec: NetworkSpec, client: Arc<dyn NetworksClientTrait>, poller: OperationPoller) -> Self {
        Self { spec, client, poller }
    }

    /// Identifier handed to the subnetwork, router, firewalls and cluster
    pub fn reference(network: &Network) -> Result<NetworkRef, ControllerError> {
        Ok(NetworkRef {
            name: network.name.clone(),
            self_link: self_link_of("Network", &network.name, network.self_link.as_ref())?,
        })
    }

    fn desired(&self) -> Network {
        Network {
            name: self.spec.name.clone(),
            auto_create_subnetworks: Some(false),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ProvisionedResource for NetworkResource {
    type Output = Network;

    fn kind(&self) -> &'static str {
        "Network"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self) -> Result<(), ControllerError> {
        require_field(self.kind(), "name", &self.spec.name)?;
        require_field(self.kind(), "project", &self.spec.project)
    }

    async fn get(&self) -> Result<Network, ControllerError> {
        self.poller.lookup(self.client.get_network(&self.spec.project, &self.spec.name)).await
    }

    async fn create(&self) -> Result<Network, ControllerError> {
        self.validate()?;
        if let Some(existing) = check_existing(self.kind(), self.name(), self.get()).await? {
            info!("Network {} already exists", self.spec.name);
            return Ok(existing);
        }

        info!("Creating network {}", self.spec.name);
        let op = self
            .poller
            .request(self.client.insert_network(&self.spec.project, &self.desired()))
            .await?;
        let op_name = op.name.clone();
        self.poller
            .wait(op, || self.client.get_global_operation(&self.spec.project, &op_name))
            .await?;

        let network = self.get().await?;
        info!("Created network {}", self.spec.name);
        Ok(network)
    }

    async fn update(&self) -> Result<Network, ControllerError> {
        self.validate()?;
        let existing = require_existing(self.kind(), self.name(), self.get()).await?;
        info!("Network {} present, nothing to update", self.spec.name);
        Ok(existing)
    }

    async fn delete(&self) -> Result<(), ControllerError> {
        self.validate()?;
        if check_existing(self.kind(), self.name(), self.get()).await?.is_none() {
            info!("Network {} already absent", self.spec.name);
            return Ok(());
        }

        info!("Deleting network {}", self.spec.name);
        let op = self
            .poller
            .request(self.client.delete_network(&self.spec.project, &self.spec.name))
            .await?;
        let op_name = op.name.clone();
        self.poller
            .wait(op, || self.client.get_global_operation(&self.spec.project, &op_name))
            .await?;
        info!("Deleted network {}", self.spec.name);
        Ok(())
    }
}
