//! Crypto key version state machine
//!
//! Brings the primary version of an existing crypto key back to ENABLED so
//! the key can encrypt cluster secrets:
//!
//! | Primary state       | Action                                  |
//! |---------------------|-----------------------------------------|
//! | `ENABLED`           | nothing                                 |
//! | `DISABLED`          | enable, wait for `ENABLED`              |
//! | `DESTROY_SCHEDULED` | restore, wait for `DISABLED`, enable    |
//! | `DESTROYED`         | new version, wait for `ENABLED`, promote |
//! | `PENDING_GENERATION`| wait for `ENABLED`                      |
//!
//! KMS applies version state changes eventually, so every transition is
//! confirmed by polling the version, bounded by `max_attempts`.

use crate::error::ControllerError;
use crate::poller::OperationPoller;
use gcp_client::{CryptoKey, CryptoKeyVersion, CryptoKeyVersionState, KmsClientTrait};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Convergence polling for key version transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyVersionSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for KeyVersionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

#[derive(Clone)]
pub struct KeyVersionStateMachine {
    client: Arc<dyn KmsClientTrait>,
    poller: OperationPoller,
    settings: KeyVersionSettings,
}

impl std::fmt::Debug for KeyVersionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVersionStateMachine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl KeyVersionStateMachine {
    pub fn new(client: Arc<dyn KmsClientTrait>, poller: OperationPoller, settings: KeyVersionSettings) -> Self {
        Self {
            client,
            poller,
            settings,
        }
    }

    /// Make sure the primary version of `key` is ENABLED
    ///
    /// Returns the version that is primary afterwards.
    pub async fn ensure_enabled(&self, key: &CryptoKey) -> Result<CryptoKeyVersion, ControllerError> {
        let primary = key.primary.as_ref().ok_or_else(|| {
            ControllerError::PreconditionFailed(format!("crypto key {} has no primary version", key.name))
        })?;

        match primary.state {
            CryptoKeyVersionState::Enabled => {
                debug!("Primary version {} of {} is enabled", primary.version_id(), key.name);
                Ok(primary.clone())
            }
            CryptoKeyVersionState::Disabled => {
                info!("Primary version {} of {} is disabled, enabling", primary.version_id(), key.name);
                self.enable(&primary.name).await
            }
            CryptoKeyVersionState::DestroyScheduled => {
                info!(
                    "Primary version {} of {} is scheduled for destruction, restoring",
                    primary.version_id(),
                    key.name
                );
                self.poller.request(self.client.restore_crypto_key_version(&primary.name)).await?;
                self.wait_for_state(&primary.name, CryptoKeyVersionState::Disabled).await?;
                self.enable(&primary.name).await
            }
            CryptoKeyVersionState::Destroyed => {
                info!("Primary version {} of {} is destroyed, rotating", primary.version_id(), key.name);
                self.replace_primary(key).await
            }
            CryptoKeyVersionState::PendingGeneration => {
                debug!("Primary version {} of {} is still being generated", primary.version_id(), key.name);
                self.wait_for_state(&primary.name, CryptoKeyVersionState::Enabled).await
            }
            CryptoKeyVersionState::Unspecified => Err(ControllerError::PreconditionFailed(format!(
                "primary version {} of {} is in an unknown state",
                primary.name, key.name
            ))),
        }
    }

    async fn enable(&self, version: &str) -> Result<CryptoKeyVersion, ControllerError> {
        self.poller
            .request(self.client.update_crypto_key_version(version, CryptoKeyVersionState::Enabled))
            .await?;
        self.wait_for_state(version, CryptoKeyVersionState::Enabled).await
    }

    async fn replace_primary(&self, key: &CryptoKey) -> Result<CryptoKeyVersion, ControllerError> {
        let created = self.poller.request(self.client.create_crypto_key_version(&key.name)).await?;
        let version = self.wait_for_state(&created.name, CryptoKeyVersionState::Enabled).await?;
        // The primary is addressed by version id, not by resource name
        self.poller
            .request(self.client.update_crypto_key_primary_version(&key.name, version.version_id()))
            .await?;
        info!("Promoted version {} to primary of {}", version.version_id(), key.name);
        Ok(version)
    }

    /// Poll `version` until KMS reports `target`
    pub async fn wait_for_state(
        &self,
        version: &str,
        target: CryptoKeyVersionState,
    ) -> Result<CryptoKeyVersion, ControllerError> {
        for attempt in 1..=self.settings.max_attempts {
            let observed = self.poller.request(self.client.get_crypto_key_version(version)).await?;
            if observed.state == target {
                return Ok(observed);
            }
            debug!(
                "Key version {} is {} (attempt {}/{}), waiting for {}",
                version, observed.state, attempt, self.settings.max_attempts, target
            );
            self.poller.sleep(self.settings.poll_interval).await?;
        }

        warn!("Key version {} did not reach {} in time", version, target);
        Err(ControllerError::Timeout {
            operation: format!("{} to become {}", version, target),
            waited: self.settings.poll_interval * self.settings.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use gcp_client::MockGcpClient;

    fn state_machine(mock: &MockGcpClient) -> KeyVersionStateMachine {
        KeyVersionStateMachine::new(Arc::new(mock.clone()), test_poller(), test_key_version_settings())
    }

    async fn key_with_primary(mock: &MockGcpClient, state: CryptoKeyVersionState) -> CryptoKey {
        let key = create_test_crypto_key(mock).await;
        let primary = key.primary.as_ref().unwrap();
        assert!(mock.set_key_version_state(&primary.name, state));
        mock.get_crypto_key(&key.name).await.unwrap()
    }

    #[tokio::test]
    async fn test_enabled_primary_is_left_alone() {
        let mock = MockGcpClient::new();
        let key = key_with_primary(&mock, CryptoKeyVersionState::Enabled).await;
        mock.clear_calls();

        let version = state_machine(&mock).ensure_enabled(&key).await.unwrap();

        assert_eq!(version.state, CryptoKeyVersionState::Enabled);
        assert!(mock.calls().is_empty(), "unexpected calls: {:?}", mock.calls());
    }

    #[tokio::test]
    async fn test_disabled_primary_is_enabled_after_convergence() {
        // Setup: KMS reports the old state for three lookups
        let mock = MockGcpClient::new();
        mock.set_version_convergence_polls(3);
        let key = key_with_primary(&mock, CryptoKeyVersionState::Disabled).await;
        let primary = key.primary.clone().unwrap();

        // Execute
        let version = state_machine(&mock).ensure_enabled(&key).await.unwrap();

        // Assert
        assert_eq!(version.state, CryptoKeyVersionState::Enabled);
        assert_eq!(mock.key_version_state(&primary.name), Some(CryptoKeyVersionState::Enabled));
        assert_eq!(mock.call_count("update_crypto_key_version 1"), 1);
        assert_eq!(mock.call_count("get_crypto_key_version 1"), 4);
    }

    #[tokio::test]
    async fn test_destroy_scheduled_primary_is_restored_then_enabled() {
        let mock = MockGcpClient::new();
        let key = key_with_primary(&mock, CryptoKeyVersionState::DestroyScheduled).await;
        let primary = key.primary.clone().unwrap();

        let version = state_machine(&mock).ensure_enabled(&key).await.unwrap();

        assert_eq!(version.name, primary.name);
        assert_eq!(version.state, CryptoKeyVersionState::Enabled);
        let restore = mock.position("restore_crypto_key_version 1").unwrap();
        let enable = mock.position("update_crypto_key_version 1").unwrap();
        assert!(restore < enable);
    }

    #[tokio::test]
    async fn test_destroyed_primary_is_replaced() {
        // Setup
        let mock = MockGcpClient::new();
        let key = key_with_primary(&mock, CryptoKeyVersionState::Destroyed).await;

        // Execute
        let version = state_machine(&mock).ensure_enabled(&key).await.unwrap();

        // Assert: a second version exists and is now primary
        assert_eq!(version.version_id(), "2");
        assert_eq!(version.state, CryptoKeyVersionState::Enabled);
        let refreshed = mock.get_crypto_key(&key.name).await.unwrap();
        assert_eq!(refreshed.primary.unwrap().name, version.name);
        assert_eq!(mock.call_count("update_crypto_key_primary_version test-controlplane"), 1);
    }

    #[tokio::test]
    async fn test_convergence_is_bounded() {
        let mock = MockGcpClient::new();
        mock.set_version_convergence_polls(100);
        let key = key_with_primary(&mock, CryptoKeyVersionState::Disabled).await;

        let err = state_machine(&mock).ensure_enabled(&key).await.unwrap_err();

        assert!(matches!(err, ControllerError::Timeout { .. }), "got {:?}", err);
        assert_eq!(
            mock.call_count("get_crypto_key_version 1"),
            test_key_version_settings().max_attempts as usize
        );
    }

    #[tokio::test]
    async fn test_key_without_primary_is_rejected() {
        let mock = MockGcpClient::new();
        let key = CryptoKey {
            name: "projects/p/locations/l/keyRings/r/cryptoKeys/k".to_string(),
            ..Default::default()
        };

        let err = state_machine(&mock).ensure_enabled(&key).await.unwrap_err();

        assert!(matches!(err, ControllerError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_failed_enable_request_is_transient() {
        let mock = MockGcpClient::new();
        let key = key_with_primary(&mock, CryptoKeyVersionState::Disabled).await;
        mock.fail_next_call("update_crypto_key_version", "backend unavailable");

        let err = state_machine(&mock).ensure_enabled(&key).await.unwrap_err();

        assert!(matches!(err, ControllerError::Transient(_)));
    }
}
