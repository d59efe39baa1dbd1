//! Router reconciler
//!
//! The private nodes have no external addresses; a Cloud NAT on the router
//! gives them egress.

use crate::config::RouterSpec;
use crate::error::ControllerError;
use crate::poller::OperationPoller;
use crate::reconcile_helpers::{check_existing, require_existing, require_field};
use crate::reconciler::{NetworkRef, ProvisionedResource};
use async_trait::async_trait;
use gcp_client::{ComputeOperation, ComputeOperationsClientTrait, Router, RouterNat, RoutersClientTrait};
use std::sync::Arc;
use tracing::info;

const NAT_IP_ALLOCATE_OPTION: &str = "AUTO_ONLY";
const NAT_SOURCE_RANGES: &str = "ALL_SUBNETWORKS_ALL_IP_RANGES";

pub struct RouterResource {
    spec: RouterSpec,
    network: NetworkRef,
    client: Arc<dyn RoutersClientTrait>,
    poller: OperationPoller,
}

impl RouterResource {
    pub fn new(spec: RouterSpec, network: NetworkRef, client: Arc<dyn RoutersClientTrait>, poller: OperationPoller) -> Self {
        Self {
            spec,
            network,
            client,
            poller,
        }
    }

    fn desired(&self) -> Router {
        Router {
            name: self.spec.name.clone(),
            network: self.network.self_link.clone(),
            nats: vec![RouterNat {
                name: self.spec.nat_name.clone(),
                nat_ip_allocate_option: Some(NAT_IP_ALLOCATE_OPTION.to_string()),
                source_subnetwork_ip_ranges_to_nat: Some(NAT_SOURCE_RANGES.to_string()),
            }],
            ..Default::default()
        }
    }

    async fn wait(&self, op: ComputeOperation) -> Result<(), ControllerError> {
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
impl ProvisionedResource for RouterResource {
    type Output = Router;

    fn kind(&self) -> &'static str {
        "Router"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self) -> Result<(), ControllerError> {
        require_field(self.kind(), "name", &self.spec.name)?;
        require_field(self.kind(), "project", &self.spec.project)?;
        require_field(self.kind(), "region", &self.spec.region)
    }

    async fn get(&self) -> Result<Router, ControllerError> {
        self.poller
            .lookup(self.client.get_router(&self.spec.project, &self.spec.region, &self.spec.name))
            .await
    }

    async fn create(&self) -> Result<Router, ControllerError> {
        self.validate()?;
        require_field(self.kind(), "network", &self.network.self_link)?;
        if let Some(existing) = check_existing(self.kind(), self.name(), self.get()).await? {
            info!("Router {} already exists", self.spec.name);
            return Ok(existing);
        }

        info!("Creating router {} with NAT {}", self.spec.name, self.spec.nat_name);
        let op = self
            .poller
            .request(
                self.client
                    .insert_router(&self.spec.project, &self.spec.region, &self.desired()),
            )
            .await?;
        self.wait(op).await?;

        let router = self.get().await?;
        info!("Created router {}", self.spec.name);
        Ok(router)
    }

    async fn update(&self) -> Result<Router, ControllerError> {
        self.validate()?;
        let existing = require_existing(self.kind(), self.name(), self.get()).await?;
        info!("Router {} present, nothing to update", self.spec.name);
        Ok(existing)
    }

    async fn delete(&self) -> Result<(), ControllerError> {
        self.validate()?;
        if check_existing(self.kind(), self.name(), self.get()).await?.is_none() {
            info!("Router {} already absent", self.spec.name);
            return Ok(());
        }

        info!("Deleting router {}", self.spec.name);
        let op = self
            .poller
            .request(
                self.client
                    .delete_router(&self.spec.project, &self.spec.region, &self.spec.name),
            )
            .await?;
        self.wait(op).await?;
        info!("Deleted router {}", self.spec.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use gcp_client::MockGcpClient;

    fn router(mock: &MockGcpClient) -> RouterResource {
        let config = test_config();
        RouterResource::new(
            config.router,
            create_test_network(mock),
            Arc::new(mock.clone()),
            test_poller(),
        )
    }

    #[tokio::test]
    async fn test_create_attaches_nat() {
        let mock = MockGcpClient::new();
        let resource = router(&mock);

        let created = resource.create().await.unwrap();

        assert_eq!(created.nats.len(), 1);
        let nat = &created.nats[0];
        assert_eq!(nat.name, "demo");
        assert_eq!(nat.nat_ip_allocate_option.as_deref(), Some("AUTO_ONLY"));
        assert_eq!(
            nat.source_subnetwork_ip_ranges_to_nat.as_deref(),
            Some("ALL_SUBNETWORKS_ALL_IP_RANGES")
        );
        assert!(created.network.ends_with("/global/networks/demo"));
    }

    #[tokio::test]
    async fn test_failed_create_can_be_retried() {
        // Setup: the first insert is rejected before reaching the provider
        let mock = MockGcpClient::new();
        let resource = router(&mock);
        mock.fail_next_call("insert_router", "rate limited");

        // Execute
        assert!(matches!(resource.create().await, Err(ControllerError::Transient(_))));
        let created = resource.create().await.unwrap();

        // Assert
        assert_eq!(created.name, "demo");
        assert_eq!(mock.call_count("insert_router demo"), 2);
    }

    #[tokio::test]
    async fn test_delete_absent_router_is_noop() {
        let mock = MockGcpClient::new();
        let resource = router(&mock);

        resource.delete().await.unwrap();

        assert_eq!(mock.call_count("delete_router demo"), 0);
    }
}
