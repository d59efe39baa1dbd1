//! Cloud KMS operations for MockGcpClient
//!
//! Handles key rings, crypto keys, key versions and IAM policies.
//! Version state rules follow the provider:
//! - only DISABLED versions can be enabled (ENABLED is a no-op)
//! - only DESTROY_SCHEDULED versions can be restored, and come back DISABLED
//! - only ENABLED versions can become primary

use super::MockGcpClient;
use super::helpers::{PendingTransition, lock};
use crate::error::GcpError;
use crate::models::*;

fn failed_precondition(message: String) -> GcpError {
    GcpError::Api { status: 400, message }
}

/// Apply one tick of pending convergence and return the observed version
fn observe_version(client: &MockGcpClient, name: &str) -> Option<CryptoKeyVersion> {
    let mut versions = lock(&client.key_versions);
    let mut pending = lock(&client.pending_transitions);
    let version = versions.get_mut(name)?;
    if let Some(transition) = pending.get_mut(name) {
        if transition.remaining_polls == 0 {
            version.state = transition.target;
            pending.remove(name);
        } else {
            transition.remaining_polls -= 1;
        }
    }
    Some(version.clone())
}

fn next_version_id(client: &MockGcpClient, key_name: &str) -> u64 {
    let prefix = format!("{}/cryptoKeyVersions/", key_name);
    lock(&client.key_versions)
        .keys()
        .filter_map(|k| k.strip_prefix(&prefix))
        .filter_map(|id| id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

fn new_version(name: String) -> CryptoKeyVersion {
    CryptoKeyVersion {
        name,
        state: CryptoKeyVersionState::Enabled,
        create_time: Some(chrono::Utc::now().to_rfc3339()),
        destroy_time: None,
    }
}

pub async fn get_key_ring(client: &MockGcpClient, name: &str) -> Result<KeyRing, GcpError> {
    client.begin("get_key_ring", name)?;
    lock(&client.key_rings)
        .get(name)
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("KeyRing {} not found", name)))
}

pub async fn create_key_ring(client: &MockGcpClient, parent: &str, key_ring_id: &str) -> Result<KeyRing, GcpError> {
    client.begin("create_key_ring", key_ring_id)?;
    let name = format!("{}/keyRings/{}", parent, key_ring_id);
    let mut key_rings = lock(&client.key_rings);
    if key_rings.contains_key(&name) {
        return Err(GcpError::Api {
            status: 409,
            message: format!("KeyRing {} already exists", name),
        });
    }
    let key_ring = KeyRing {
        name: name.clone(),
        create_time: Some(chrono::Utc::now().to_rfc3339()),
    };
    key_rings.insert(name, key_ring.clone());
    Ok(key_ring)
}

pub async fn get_crypto_key(client: &MockGcpClient, name: &str) -> Result<CryptoKey, GcpError> {
    client.begin("get_crypto_key", name)?;
    let mut key = lock(&client.crypto_keys)
        .get(name)
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("CryptoKey {} not found", name)))?;
    // The primary is reported with its current state
    if let Some(primary) = key.primary.as_mut() {
        if let Some(current) = lock(&client.key_versions).get(&primary.name) {
            *primary = current.clone();
        }
    }
    Ok(key)
}

pub async fn create_crypto_key(
    client: &MockGcpClient,
    parent: &str,
    crypto_key_id: &str,
    key: &CryptoKey,
) -> Result<CryptoKey, GcpError> {
    client.begin("create_crypto_key", crypto_key_id)?;
    if !lock(&client.key_rings).contains_key(parent) {
        return Err(GcpError::NotFound(format!("KeyRing {} not found", parent)));
    }
    let name = format!("{}/cryptoKeys/{}", parent, crypto_key_id);
    if lock(&client.crypto_keys).contains_key(&name) {
        return Err(GcpError::Api {
            status: 409,
            message: format!("CryptoKey {} already exists", name),
        });
    }

    let version = new_version(format!("{}/cryptoKeyVersions/1", name));
    lock(&client.key_versions).insert(version.name.clone(), version.clone());

    let created = CryptoKey {
        name: name.clone(),
        purpose: key.purpose,
        primary: Some(version),
        create_time: Some(chrono::Utc::now().to_rfc3339()),
    };
    lock(&client.crypto_keys).insert(name, created.clone());
    Ok(created)
}

pub async fn get_crypto_key_version(client: &MockGcpClient, name: &str) -> Result<CryptoKeyVersion, GcpError> {
    client.begin("get_crypto_key_version", name)?;
    observe_version(client, name)
        .ok_or_else(|| GcpError::NotFound(format!("CryptoKeyVersion {} not found", name)))
}

pub async fn update_crypto_key_version(
    client: &MockGcpClient,
    name: &str,
    state: CryptoKeyVersionState,
) -> Result<CryptoKeyVersion, GcpError> {
    client.begin("update_crypto_key_version", name)?;
    let convergence = *lock(&client.version_convergence_polls);
    let mut versions = lock(&client.key_versions);
    let version = versions
        .get_mut(name)
        .ok_or_else(|| GcpError::NotFound(format!("CryptoKeyVersion {} not found", name)))?;

    match (version.state, state) {
        (current, target) if current == target => {}
        (CryptoKeyVersionState::Disabled, CryptoKeyVersionState::Enabled)
        | (CryptoKeyVersionState::Enabled, CryptoKeyVersionState::Disabled) => {
            if convergence == 0 {
                version.state = state;
            } else {
                lock(&client.pending_transitions).insert(
                    name.to_string(),
                    PendingTransition {
                        remaining_polls: convergence,
                        target: state,
                    },
                );
            }
        }
        (current, target) => {
            return Err(failed_precondition(format!(
                "CryptoKeyVersion {} is {} and cannot transition to {}",
                name, current, target
            )));
        }
    }
    Ok(version.clone())
}

pub async fn create_crypto_key_version(client: &MockGcpClient, parent: &str) -> Result<CryptoKeyVersion, GcpError> {
    client.begin("create_crypto_key_version", parent)?;
    if !lock(&client.crypto_keys).contains_key(parent) {
        return Err(GcpError::NotFound(format!("CryptoKey {} not found", parent)));
    }
    let id = next_version_id(client, parent);
    let version = new_version(format!("{}/cryptoKeyVersions/{}", parent, id));
    lock(&client.key_versions).insert(version.name.clone(), version.clone());
    Ok(version)
}

pub async fn update_crypto_key_primary_version(
    client: &MockGcpClient,
    name: &str,
    version_id: &str,
) -> Result<CryptoKey, GcpError> {
    client.begin("update_crypto_key_primary_version", name)?;
    if version_id.contains('/') {
        return Err(GcpError::InvalidRequest(format!(
            "cryptoKeyVersionId must be an id, got {}",
            version_id
        )));
    }
    let version_name = format!("{}/cryptoKeyVersions/{}", name, version_id);
    let version = lock(&client.key_versions)
        .get(&version_name)
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("CryptoKeyVersion {} not found", version_name)))?;
    if version.state != CryptoKeyVersionState::Enabled {
        return Err(failed_precondition(format!(
            "CryptoKeyVersion {} is {} and cannot become primary",
            version_name, version.state
        )));
    }

    let mut keys = lock(&client.crypto_keys);
    let key = keys
        .get_mut(name)
        .ok_or_else(|| GcpError::NotFound(format!("CryptoKey {} not found", name)))?;
    key.primary = Some(version);
    Ok(key.clone())
}

pub async fn restore_crypto_key_version(client: &MockGcpClient, name: &str) -> Result<CryptoKeyVersion, GcpError> {
    client.begin("restore_crypto_key_version", name)?;
    let mut versions = lock(&client.key_versions);
    let version = versions
        .get_mut(name)
        .ok_or_else(|| GcpError::NotFound(format!("CryptoKeyVersion {} not found", name)))?;
    if version.state != CryptoKeyVersionState::DestroyScheduled {
        return Err(failed_precondition(format!(
            "CryptoKeyVersion {} is {} and cannot be restored",
            name, version.state
        )));
    }
    version.state = CryptoKeyVersionState::Disabled;
    version.destroy_time = None;
    Ok(version.clone())
}

fn kms_resource_exists(client: &MockGcpClient, resource: &str) -> bool {
    lock(&client.crypto_keys).contains_key(resource) || lock(&client.key_rings).contains_key(resource)
}

pub async fn get_iam_policy(client: &MockGcpClient, resource: &str) -> Result<Policy, GcpError> {
    client.begin("get_iam_policy", resource)?;
    if !kms_resource_exists(client, resource) {
        return Err(GcpError::NotFound(format!("Resource {} not found", resource)));
    }
    Ok(lock(&client.iam_policies).get(resource).cloned().unwrap_or_default())
}

pub async fn set_iam_policy(client: &MockGcpClient, resource: &str, policy: &Policy) -> Result<Policy, GcpError> {
    client.begin("set_iam_policy", resource)?;
    if !kms_resource_exists(client, resource) {
        return Err(GcpError::NotFound(format!("Resource {} not found", resource)));
    }
    let mut policies = lock(&client.iam_policies);
    let current_etag = policies.get(resource).and_then(|p| p.etag.clone());
    if policy.etag.is_some() && policy.etag != current_etag {
        return Err(GcpError::Api {
            status: 409,
            message: format!("IAM policy for {} was modified concurrently", resource),
        });
    }
    let mut stored = policy.clone();
    stored.etag = Some(format!("BwY{}", client.next_id()));
    policies.insert(resource.to_string(), stored.clone());
    Ok(stored)
}
