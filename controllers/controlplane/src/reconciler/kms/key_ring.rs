//! KeyRing reconciler

use crate::config::KeyRingSpec;
use crate::error::ControllerError;
use crate::poller::OperationPoller;
use crate::reconcile_helpers::{check_existing, require_existing, require_field};
use crate::reconciler::{KeyRingRef, ProvisionedResource};
use async_trait::async_trait;
use gcp_client::{KeyRing, KmsClientTrait};
use std::sync::Arc;
use tracing::info;

pub struct KeyRingResource {
    spec: KeyRingSpec,
    client: Arc<dyn KmsClientTrait>,
    poller: OperationPoller,
}

impl KeyRingResource {
    pub fn new(spec: KeyRingSpec, client: Arc<dyn KmsClientTrait>, poller: OperationPoller) -> Self {
        Self { spec, client, poller }
    }

    pub fn reference(key_ring: &KeyRing) -> KeyRingRef {
        KeyRingRef {
            name: key_ring.name.clone(),
        }
    }
}

#[async_trait]
impl ProvisionedResource for KeyRingResource {
    type Output = KeyRing;

    fn kind(&self) -> &'static str {
        "KeyRing"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self) -> Result<(), ControllerError> {
        require_field(self.kind(), "name", &self.spec.name)?;
        require_field(self.kind(), "project", &self.spec.project)?;
        require_field(self.kind(), "location", &self.spec.location)
    }

    async fn get(&self) -> Result<KeyRing, ControllerError> {
        self.poller
            .lookup(self.client.get_key_ring(&self.spec.full_name()))
            .await
    }

    async fn create(&self) -> Result<KeyRing, ControllerError> {
        self.validate()?;
        if let Some(existing) = check_existing(self.kind(), self.name(), self.get()).await? {
            info!("Key ring {} already exists", existing.name);
            return Ok(existing);
        }

        info!("Creating key ring {}", self.spec.full_name());
        let key_ring = self
            .poller
            .request(self.client.create_key_ring(&self.spec.parent(), &self.spec.name))
            .await?;
        info!("Created key ring {}", key_ring.name);
        Ok(key_ring)
    }

    async fn update(&self) -> Result<KeyRing, ControllerError> {
        self.validate()?;
        require_existing(self.kind(), self.name(), self.get()).await
    }

    async fn delete(&self) -> Result<(), ControllerError> {
        // KMS keeps key rings forever
        info!("Key ring {} cannot be deleted, leaving it in place", self.spec.full_name());
        Ok(())
    }
}
