//! Firewall reconciler

use crate::config::FirewallSpec;
use crate::error::ControllerError;
use crate::poller::OperationPoller;
use crate::reconcile_helpers::{check_existing, require_existing, require_field};
use crate::reconciler::{NetworkRef, ProvisionedResource};
use async_trait::async_trait;
use gcp_client::{ComputeOperation, ComputeOperationsClientTrait, Firewall, FirewallsClientTrait};
use std::sync::Arc;
use tracing::info;

pub struct FirewallResource {
    spec: FirewallSpec,
    network: NetworkRef,
    client: Arc<dyn FirewallsClientTrait>,
    poller: OperationPoller,
}

impl FirewallResource {
    pub fn new(
        spec: FirewallSpec,
        network: NetworkRef,
        client: Arc<dyn FirewallsClientTrait>,
        poller: OperationPoller,
    ) -> Self {
        Self {
            spec,
            network,
            client,
            poller,
        }
    }

    fn desired(&self) -> Firewall {
        Firewall {
            name: self.spec.name.clone(),
            network: self.network.self_link.clone(),
            direction: self.spec.direction,
            allowed: self.spec.allowed.clone(),
            source_ranges: self.spec.source_ranges.clone(),
            destination_ranges: self.spec.destination_ranges.clone(),
            target_tags: self.spec.target_tags.clone(),
            ..Default::default()
        }
    }

    async fn wait(&self, op: ComputeOperation) -> Result<(), ControllerError> {
        let op_name = op.name.clone();
        self.poller
            .wait(op, || self.client.get_global_operation(&self.spec.project, &op_name))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProvisionedResource for FirewallResource {
    type Output = Firewall;

    fn kind(&self) -> &'static str {
        "Firewall"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self) -> Result<(), ControllerError> {
        require_field(self.kind(), "name", &self.spec.name)?;
        require_field(self.kind(), "project", &self.spec.project)?;
        if self.spec.allowed.is_empty() {
            return Err(ControllerError::PreconditionFailed(format!(
                "Firewall {} allows nothing",
                self.spec.name
            )));
        }
        Ok(())
    }

    async fn get(&self) -> Result<Firewall, ControllerError> {
        self.poller
            .lookup(self.client.get_firewall(&self.spec.project, &self.spec.name))
            .await
    }

    async fn create(&self) -> Result<Firewall, ControllerError> {
        self.validate()?;
        require_field(self.kind(), "network", &self.network.self_link)?;
        if let Some(existing) = check_existing(self.kind(), self.name(), self.get()).await? {
            info!("Firewall {} already exists", self.spec.name);
            return Ok(existing);
        }

        info!("Creating firewall {} ({})", self.spec.name, self.spec.direction);
        let op = self
            .poller
            .request(self.client.insert_firewall(&self.spec.project, &self.desired()))
            .await?;
        self.wait(op).await?;

        let firewall = self.get().await?;
        info!("Created firewall {}", self.spec.name);
        Ok(firewall)
    }

    async fn update(&self) -> Result<Firewall, ControllerError> {
        self.validate()?;
        let existing = require_existing(self.kind(), self.name(), self.get()).await?;
        info!("Firewall {} present, nothing to update", self.spec.name);
        Ok(existing)
    }

    async fn delete(&self) -> Result<(), ControllerError> {
        self.validate()?;
        if check_existing(self.kind(), self.name(), self.get()).await?.is_none() {
            info!("Firewall {} already absent", self.spec.name);
            return Ok(());
        }

        info!("Deleting firewall {}", self.spec.name);
        let op = self
            .poller
            .request(self.client.delete_firewall(&self.spec.project, &self.spec.name))
            .await?;
        self.wait(op).await?;
        info!("Deleted firewall {}", self.spec.name);
        Ok(())
    }
}
