//! Subnetwork reconciler

use crate::config::{PODS_RANGE_NAME, SERVICES_RANGE_NAME, SubnetworkSpec};
use crate::error::ControllerError;
use crate::poller::OperationPoller;
use crate::reconcile_helpers::{check_existing, require_existing, require_field};
use crate::reconciler::{NetworkRef, ProvisionedResource, SubnetworkRef, self_link_of};
use async_trait::async_trait;
use gcp_client::{ComputeOperationsClientTrait, SecondaryIpRange, Subnetwork, SubnetworksClientTrait};
use std::sync::Arc;
use tracing::info;

/// Node subnetwork with the `pods` and `services` secondary ranges
pub struct SubnetworkResource {
    spec: SubnetworkSpec,
    network: NetworkRef,
    client: Arc<dyn SubnetworksClientTrait>,
    poller: OperationPoller,
}

impl SubnetworkResource {
    pub fn new(
        spec: SubnetworkSpec,
        network: NetworkRef,
        client: Arc<dyn SubnetworksClientTrait>,
        poller: OperationPoller,
    ) -> Self {
        Self {
            spec,
            network,
            client,
            poller,
        }
    }

    pub fn reference(subnetwork: &Subnetwork) -> Result<SubnetworkRef, ControllerError> {
        Ok(SubnetworkRef {
            name: subnetwork.name.clone(),
            self_link: self_link_of("Subnetwork", &subnetwork.name, subnetwork.self_link.as_ref())?,
        })
    }

    fn desired(&self) -> Subnetwork {
        Subnetwork {
            name: self.spec.name.clone(),
            network: self.network.self_link.clone(),
            ip_cidr_range: self.spec.nodes_cidr.clone(),
            private_ip_google_access: Some(true),
            secondary_ip_ranges: vec![
                SecondaryIpRange {
                    range_name: PODS_RANGE_NAME.to_string(),
                    ip_cidr_range: self.spec.pods_cidr.clone(),
                },
                SecondaryIpRange {
                    range_name: SERVICES_RANGE_NAME.to_string(),
                    ip_cidr_range: self.spec.services_cidr.clone(),
                },
            ],
            ..Default::default()
        }
    }

    async fn wait(&self, op: gcp_client::ComputeOperation) -> Result<(), ControllerError> {
        let op_name = op.name.clone();
        self.poller
            .wait(op, || {
                self.client
                    .get_region_operation(&self.spec.project, &self.spec.region, &op_name)
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProvisionedResource for SubnetworkResource {
    type Output = Subnetwork;

    fn kind(&self) -> &'static str {
        "Subnetwork"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self) -> Result<(), ControllerError> {
        require_field(self.kind(), "name", &self.spec.name)?;
        require_field(self.kind(), "project", &self.spec.project)?;
        require_field(self.kind(), "region", &self.spec.region)?;
        require_field(self.kind(), "network", &self.network.self_link)
    }

    async fn get(&self) -> Result<Subnetwork, ControllerError> {
        self.poller
            .lookup(
                self.client
                    .get_subnetwork(&self.spec.project, &self.spec.region, &self.spec.name),
            )
            .await
    }

    async fn create(&self) -> Result<Subnetwork, ControllerError> {
        self.validate()?;
        if let Some(existing) = check_existing(self.kind(), self.name(), self.get()).await? {
            info!("Subnetwork {} already exists", self.spec.name);
            return Ok(existing);
        }

        info!(
            "Creating subnetwork {} ({}) in {}",
            self.spec.name, self.spec.nodes_cidr, self.network.name
        );
        let op = self
            .poller
            .request(
                self.client
                    .insert_subnetwork(&self.spec.project, &self.spec.region, &self.desired()),
            )
            .await?;
        self.wait(op).await?;

        let subnetwork = self.get().await?;
        info!("Created subnetwork {}", self.spec.name);
        Ok(subnetwork)
    }

    async fn update(&self) -> Result<Subnetwork, ControllerError> {
        self.validate()?;
        let existing = require_existing(self.kind(), self.name(), self.get()).await?;
        info!("Subnetwork {} present, nothing to update", self.spec.name);
        Ok(existing)
    }

    async fn delete(&self) -> Result<(), ControllerError> {
        self.validate()?;
        if check_existing(self.kind(), self.name(), self.get()).await?.is_none() {
            info!("Subnetwork {} already absent", self.spec.name);
            return Ok(());
        }

        info!("Deleting subnetwork {}", self.spec.name);
        let op = self
            .poller
            .request(
                self.client
                    .delete_subnetwork(&self.spec.project, &self.spec.region, &self.spec.name),
            )
            .await?;
        self.wait(op).await?;
        info!("Deleted subnetwork {}", self.spec.name);
        Ok(())
    }
}
