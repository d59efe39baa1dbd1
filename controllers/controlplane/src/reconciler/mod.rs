//! Resource primitives for the controlplane graph.
//!
//! This module is organized by provider API:
//! - `compute`: Network, Subnetwork, Router (with NAT), Firewall
//! - `kms`: KeyRing, CryptoKey (version state and IAM)
//! - `container`: GKE Cluster
//!
//! Every kind implements [`ProvisionedResource`]. A primitive holds its own
//! spec, the identifiers produced by the stages it depends on, and the
//! capability client it talks to. Nothing is cached: each call starts from
//! the live provider state.

pub mod compute;
pub mod container;
pub mod kms;

use crate::error::ControllerError;
use async_trait::async_trait;

/// Uniform lifecycle of one provider resource
#[async_trait]
pub trait ProvisionedResource: Send + Sync {
    /// Provider representation returned by `get`, `create` and `update`
    type Output: Send;

    /// Human readable kind, used in logs and errors
    fn kind(&self) -> &'static str;

    /// Resource name (short form)
    fn name(&self) -> &str;

    /// Reject empty required fields before any provider call
    fn validate(&self) -> Result<(), ControllerError>;

    /// Fetch the current provider state; `NotFound` when absent
    async fn get(&self) -> Result<Self::Output, ControllerError>;

    /// True iff `get` succeeds; any error other than `NotFound` propagates
    async fn exists(&self) -> Result<bool, ControllerError> {
        match self.get().await {
            Ok(_) => Ok(true),
            Err(ControllerError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create unless present; an existing resource is returned unchanged
    async fn create(&self) -> Result<Self::Output, ControllerError>;

    /// Reconcile an existing resource; fails with `PreconditionFailed` when absent
    async fn update(&self) -> Result<Self::Output, ControllerError>;

    /// Delete if present and wait for completion
    async fn delete(&self) -> Result<(), ControllerError>;
}

/// Network produced by the first stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRef {
    pub name: String,
    pub self_link: String,
}

impl NetworkRef {
    /// Reference built from names alone, for stages that run without a
    /// preceding create (teardown)
    pub fn derived(project: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            self_link: format!("https://www.googleapis.com/compute/v1/projects/{}/global/networks/{}", project, name),
        }
    }
}

/// Subnetwork the cluster nodes live in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetworkRef {
    pub name: String,
    pub self_link: String,
}

impl SubnetworkRef {
    pub fn derived(project: &str, region: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            self_link: format!(
                "https://www.googleapis.com/compute/v1/projects/{}/regions/{}/subnetworks/{}",
                project, region, name
            ),
        }
    }
}

/// Full resource name of a key ring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRingRef {
    pub name: String,
}

/// Full resource name of the crypto key that encrypts cluster secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoKeyRef {
    pub name: String,
}

/// Self-link of a provider resource, or an error if the provider left it out
pub(crate) fn self_link_of(kind: &str, name: &str, self_link: Option<&String>) -> Result<String, ControllerError> {
    self_link
        .cloned()
        .ok_or_else(|| ControllerError::InvalidConfig(format!("{} {} has no selfLink", kind, name)))
}
