//! CryptoKey reconciler
//!
//! Besides the key itself this primitive owns two things:
//! - the primary version, which must be ENABLED before the cluster uses the
//!   key (delegated to [`KeyVersionStateMachine`])
//! - the service agent's encrypter/decrypter grant on the key
//!
//! Teardown revokes the grant but keeps the key: destroying key material
//! would make any data still encrypted with it unreadable.

use crate::config::CryptoKeySpec;
use crate::error::ControllerError;
use crate::key_version::KeyVersionStateMachine;
use crate::poller::OperationPoller;
use crate::reconcile_helpers::{check_existing, require_existing, require_field};
use crate::reconciler::{CryptoKeyRef, KeyRingRef, ProvisionedResource};
use async_trait::async_trait;
use gcp_client::{CryptoKey, KmsClientTrait, Policy};
use std::sync::Arc;
use tracing::{debug, info};

pub const ENCRYPTER_ROLE: &str = "roles/cloudkms.cryptoKeyEncrypter";
pub const DECRYPTER_ROLE: &str = "roles/cloudkms.cryptoKeyDecrypter";

const ROLES: [&str; 2] = [DECRYPTER_ROLE, ENCRYPTER_ROLE];

pub struct CryptoKeyResource {
    spec: CryptoKeySpec,
    key_ring: KeyRingRef,
    client: Arc<dyn KmsClientTrait>,
    poller: OperationPoller,
    key_versions: KeyVersionStateMachine,
}

impl CryptoKeyResource {
    pub fn new(
        spec: CryptoKeySpec,
        key_ring: KeyRingRef,
        client: Arc<dyn KmsClientTrait>,
        poller: OperationPoller,
        key_versions: KeyVersionStateMachine,
    ) -> Self {
        Self {
            spec,
            key_ring,
            client,
            poller,
            key_versions,
        }
    }

    /// `{key ring}/cryptoKeys/{name}`
    pub fn full_name(&self) -> String {
        format!("{}/cryptoKeys/{}", self.key_ring.name, self.spec.name)
    }

    pub fn reference(key: &CryptoKey) -> CryptoKeyRef {
        CryptoKeyRef { name: key.name.clone() }
    }

    /// Grant the service agent both roles.
    ///
    /// With `force` the policy is written back even if nothing changed.
    async fn grant(&self, force: bool) -> Result<(), ControllerError> {
        let resource = self.full_name();
        let mut policy: Policy = self.poller.request(self.client.get_iam_policy(&resource)).await?;

        let mut changed = false;
        for role in ROLES {
            changed |= policy.add_member(role, &self.spec.service_agent);
        }
        if !changed && !force {
            debug!("{} already holds the encryption roles on {}", self.spec.service_agent, resource);
            return Ok(());
        }

        info!("Granting {} encrypt/decrypt on {}", self.spec.service_agent, resource);
        self.poller
            .request(self.client.set_iam_policy(&resource, &policy))
            .await?;
        Ok(())
    }

    /// Remove the service agent from both roles, dropping emptied bindings
    async fn revoke(&self) -> Result<(), ControllerError> {
        let resource = self.full_name();
        let mut policy: Policy = self.poller.request(self.client.get_iam_policy(&resource)).await?;

        let mut changed = false;
        for role in ROLES {
            changed |= policy.remove_member(role, &self.spec.service_agent);
        }
        if !changed {
            info!("{} holds no roles on {}", self.spec.service_agent, resource);
            return Ok(());
        }

        info!("Revoking {} encrypt/decrypt on {}", self.spec.service_agent, resource);
        self.poller
            .request(self.client.set_iam_policy(&resource, &policy))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProvisionedResource for CryptoKeyResource {
    type Output = CryptoKey;

    fn kind(&self) -> &'static str {
        "CryptoKey"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self) -> Result<(), ControllerError> {
        require_field(self.kind(), "name", &self.spec.name)?;
        require_field(self.kind(), "keyRing", &self.key_ring.name)?;
        require_field(self.kind(), "serviceAgent", &self.spec.service_agent)
    }

    async fn get(&self) -> Result<CryptoKey, ControllerError> {
        self.poller
            .lookup(self.client.get_crypto_key(&self.full_name()))
            .await
    }

    async fn create(&self) -> Result<CryptoKey, ControllerError> {
        self.validate()?;
        match check_existing(self.kind(), self.name(), self.get()).await? {
            Some(existing) => {
                info!("Crypto key {} already exists", existing.name);
                self.key_versions.ensure_enabled(&existing).await?;
            }
            None => {
                info!("Creating crypto key {}", self.full_name());
                let desired = CryptoKey {
                    purpose: self.spec.purpose,
                    ..Default::default()
                };
                let created = self
                    .poller
                    .request(
                        self.client
                            .create_crypto_key(&self.key_ring.name, &self.spec.name, &desired),
                    )
                    .await?;
                info!("Created crypto key {}", created.name);
            }
        }

        self.grant(false).await?;
        self.get().await
    }

    async fn update(&self) -> Result<CryptoKey, ControllerError> {
        self.validate()?;
        let existing = require_existing(self.kind(), self.name(), self.get()).await?;
        self.key_versions.ensure_enabled(&existing).await?;
        self.grant(true).await?;
        self.get().await
    }

    async fn delete(&self) -> Result<(), ControllerError> {
        self.validate()?;
        if check_existing(self.kind(), self.name(), self.get()).await?.is_none() {
            info!("Crypto key {} absent, nothing to revoke", self.full_name());
            return Ok(());
        }
        self.revoke().await?;
        info!("Crypto key {} kept; key material is never destroyed", self.full_name());
        Ok(())
    }
}
