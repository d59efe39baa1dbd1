//! Test utilities for unit testing reconcilers
//!
//! Builders for manifests, configs and pre-seeded mock state, plus poll
//! settings short enough to keep the suite fast.

use crate::config::ControlplaneConfig;
use crate::key_version::KeyVersionSettings;
use crate::poller::{OperationPoller, PollSettings};
use crate::reconciler::NetworkRef;
use crds::{Controlplane, ControlplaneSpec};
use gcp_client::{CryptoKey, GcpClients, KmsClientTrait, MockGcpClient, Network};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const TEST_PROJECT: &str = "demo-project";
pub const TEST_PROJECT_NUMBER: &str = "123456789";
pub const TEST_REGION: &str = "us-central1";

/// Millisecond polling with a generous overall bound
pub fn test_poll_settings() -> PollSettings {
    PollSettings {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        multiplier: 2,
        max_elapsed: Duration::from_secs(5),
    }
}

pub fn test_poller() -> OperationPoller {
    OperationPoller::new(test_poll_settings(), CancellationToken::new())
}

pub fn test_key_version_settings() -> KeyVersionSettings {
    KeyVersionSettings {
        poll_interval: Duration::from_millis(1),
        max_attempts: 5,
    }
}

/// Helper to create a test Controlplane manifest with default spec
pub fn create_test_manifest(name: &str) -> Controlplane {
    Controlplane {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: ControlplaneSpec {
            project_id: TEST_PROJECT.to_string(),
            region: TEST_REGION.to_string(),
            ..Default::default()
        },
        status: None,
    }
}

/// Expanded graph for the `demo` controlplane
pub fn test_config() -> ControlplaneConfig {
    ControlplaneConfig::from_manifest(&create_test_manifest("demo"), TEST_PROJECT_NUMBER)
        .expect("test manifest is valid")
}

pub fn test_clients(mock: &MockGcpClient) -> GcpClients {
    GcpClients::from_client(mock.clone())
}

/// Seed the `demo` network and return its reference
pub fn create_test_network(mock: &MockGcpClient) -> NetworkRef {
    mock.add_network(
        TEST_PROJECT,
        Network {
            name: "demo".to_string(),
            auto_create_subnetworks: Some(false),
            ..Default::default()
        },
    );
    NetworkRef::derived(TEST_PROJECT, "demo")
}

/// Seed a key ring and an ENCRYPT_DECRYPT key named `test-controlplane`
///
/// The key has version `1` as its ENABLED primary.
pub async fn create_test_crypto_key(mock: &MockGcpClient) -> CryptoKey {
    let parent = format!("projects/{}/locations/{}", TEST_PROJECT, TEST_REGION);
    let key_ring = mock
        .create_key_ring(&parent, "test-controlplane")
        .await
        .expect("key ring is created");
    mock.create_crypto_key(&key_ring.name, "test-controlplane", &CryptoKey::default())
        .await
        .expect("crypto key is created")
}
