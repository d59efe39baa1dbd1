//! Compute operations for MockGcpClient
//!
//! Handles networks, subnetworks, routers, firewalls and their operations

use super::MockGcpClient;
use super::helpers::{MockOperation, lock};
use crate::error::GcpError;
use crate::models::*;

fn already_exists(kind: &str, name: &str) -> GcpError {
    GcpError::Api {
        status: 409,
        message: format!("The resource '{}' of kind '{}' already exists", name, kind),
    }
}

fn to_compute_operation(name: &str, op: &MockOperation) -> ComputeOperation {
    let done = op.is_done();
    ComputeOperation {
        name: name.to_string(),
        status: if done {
            ComputeOperationStatus::Done
        } else {
            ComputeOperationStatus::Running
        },
        operation_type: Some(op.operation_type.clone()),
        target_link: Some(op.target.clone()),
        region: op.region.clone(),
        error: op.error.as_ref().filter(|_| done).map(|message| ComputeOperationError {
            errors: vec![ComputeOperationErrorItem {
                code: "RESOURCE_OPERATION_FAILED".to_string(),
                message: message.clone(),
            }],
        }),
        http_error_message: None,
    }
}

/// Register a new operation; returns it along with whether the mutation should be applied
fn start_operation(
    client: &MockGcpClient,
    operation_type: &str,
    target: &str,
    region: Option<&str>,
) -> (ComputeOperation, bool) {
    let op = client.new_operation(operation_type, target, region);
    let apply = op.error.is_none();
    let name = format!("operation-{}-{}", client.next_id(), operation_type);
    let response = to_compute_operation(&name, &op);
    lock(&client.compute_operations).insert(name, op);
    (response, apply)
}

pub(crate) fn with_network_link(client: &MockGcpClient, project: &str, mut network: Network) -> Network {
    network.self_link = Some(format!(
        "{}/projects/{}/global/networks/{}",
        client.compute_base, project, network.name
    ));
    network
}

pub(crate) fn with_subnetwork_link(
    client: &MockGcpClient,
    project: &str,
    region: &str,
    mut subnetwork: Subnetwork,
) -> Subnetwork {
    subnetwork.self_link = Some(format!(
        "{}/projects/{}/regions/{}/subnetworks/{}",
        client.compute_base, project, region, subnetwork.name
    ));
    subnetwork.region = Some(region.to_string());
    subnetwork
}

pub async fn get_operation(
    client: &MockGcpClient,
    _project: &str,
    region: Option<&str>,
    operation: &str,
) -> Result<ComputeOperation, GcpError> {
    let method = if region.is_some() {
        "get_region_operation"
    } else {
        "get_global_operation"
    };
    client.begin(method, operation)?;
    let mut operations = lock(&client.compute_operations);
    let op = operations
        .get_mut(operation)
        .ok_or_else(|| GcpError::NotFound(format!("Operation {} not found", operation)))?;
    op.poll();
    Ok(to_compute_operation(operation, op))
}

// Networks

pub async fn get_network(client: &MockGcpClient, project: &str, name: &str) -> Result<Network, GcpError> {
    client.begin("get_network", name)?;
    lock(&client.networks)
        .get(&format!("{}/{}", project, name))
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("Network {} not found", name)))
}

pub async fn insert_network(
    client: &MockGcpClient,
    project: &str,
    network: &Network,
) -> Result<ComputeOperation, GcpError> {
    client.begin("insert_network", &network.name)?;
    let key = format!("{}/{}", project, network.name);
    if lock(&client.networks).contains_key(&key) {
        return Err(already_exists("compute#network", &network.name));
    }
    let stored = with_network_link(client, project, network.clone());
    let target = stored.self_link.clone().unwrap_or_default();
    let (op, apply) = start_operation(client, "insert", &target, None);
    if apply {
        lock(&client.networks).insert(key, stored);
    }
    Ok(op)
}

pub async fn delete_network(client: &MockGcpClient, project: &str, name: &str) -> Result<ComputeOperation, GcpError> {
    client.begin("delete_network", name)?;
    let key = format!("{}/{}", project, name);
    let target = lock(&client.networks)
        .get(&key)
        .and_then(|n| n.self_link.clone())
        .ok_or_else(|| GcpError::NotFound(format!("Network {} not found", name)))?;

    // A network cannot be removed while anything still references it
    let in_use = lock(&client.subnetworks).values().any(|s| s.network == target)
        || lock(&client.routers).values().any(|r| r.network == target)
        || lock(&client.firewalls).values().any(|f| f.network == target);
    if in_use {
        return Err(GcpError::Api {
            status: 400,
            message: format!("The network resource '{}' is already being used", name),
        });
    }

    let (op, apply) = start_operation(client, "delete", &target, None);
    if apply {
        lock(&client.networks).remove(&key);
    }
    Ok(op)
}

// Subnetworks

pub async fn get_subnetwork(
    client: &MockGcpClient,
    project: &str,
    region: &str,
    name: &str,
) -> Result<Subnetwork, GcpError> {
    client.begin("get_subnetwork", name)?;
    lock(&client.subnetworks)
        .get(&format!("{}/{}/{}", project, region, name))
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("Subnetwork {} not found", name)))
}

pub async fn insert_subnetwork(
    client: &MockGcpClient,
    project: &str,
    region: &str,
    subnetwork: &Subnetwork,
) -> Result<ComputeOperation, GcpError> {
    client.begin("insert_subnetwork", &subnetwork.name)?;
    let key = format!("{}/{}/{}", project, region, subnetwork.name);
    if lock(&client.subnetworks).contains_key(&key) {
        return Err(already_exists("compute#subnetwork", &subnetwork.name));
    }
    let network_known = lock(&client.networks)
        .values()
        .any(|n| n.self_link.as_deref() == Some(subnetwork.network.as_str()));
    if !network_known {
        return Err(GcpError::Api {
            status: 400,
            message: format!("Invalid value for field 'resource.network': '{}'", subnetwork.network),
        });
    }
    let stored = with_subnetwork_link(client, project, region, subnetwork.clone());
    let target = stored.self_link.clone().unwrap_or_default();
    let (op, apply) = start_operation(client, "insert", &target, Some(region));
    if apply {
        lock(&client.subnetworks).insert(key, stored);
    }
    Ok(op)
}

pub async fn delete_subnetwork(
    client: &MockGcpClient,
    project: &str,
    region: &str,
    name: &str,
) -> Result<ComputeOperation, GcpError> {
    client.begin("delete_subnetwork", name)?;
    let key = format!("{}/{}/{}", project, region, name);
    let target = lock(&client.subnetworks)
        .get(&key)
        .and_then(|s| s.self_link.clone())
        .ok_or_else(|| GcpError::NotFound(format!("Subnetwork {} not found", name)))?;
    let (op, apply) = start_operation(client, "delete", &target, Some(region));
    if apply {
        lock(&client.subnetworks).remove(&key);
    }
    Ok(op)
}

// Routers

pub async fn get_router(client: &MockGcpClient, project: &str, region: &str, name: &str) -> Result<Router, GcpError> {
    client.begin("get_router", name)?;
    lock(&client.routers)
        .get(&format!("{}/{}/{}", project, region, name))
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("Router {} not found", name)))
}

pub async fn insert_router(
    client: &MockGcpClient,
    project: &str,
    region: &str,
    router: &Router,
) -> Result<ComputeOperation, GcpError> {
    client.begin("insert_router", &router.name)?;
    let key = format!("{}/{}/{}", project, region, router.name);
    if lock(&client.routers).contains_key(&key) {
        return Err(already_exists("compute#router", &router.name));
    }
    let mut stored = router.clone();
    let target = format!(
        "{}/projects/{}/regions/{}/routers/{}",
        client.compute_base, project, region, router.name
    );
    stored.self_link = Some(target.clone());
    stored.region = Some(region.to_string());
    let (op, apply) = start_operation(client, "insert", &target, Some(region));
    if apply {
        lock(&client.routers).insert(key, stored);
    }
    Ok(op)
}

pub async fn delete_router(
    client: &MockGcpClient,
    project: &str,
    region: &str,
    name: &str,
) -> Result<ComputeOperation, GcpError> {
    client.begin("delete_router", name)?;
    let key = format!("{}/{}/{}", project, region, name);
    let target = lock(&client.routers)
        .get(&key)
        .and_then(|r| r.self_link.clone())
        .ok_or_else(|| GcpError::NotFound(format!("Router {} not found", name)))?;
    let (op, apply) = start_operation(client, "delete", &target, Some(region));
    if apply {
        lock(&client.routers).remove(&key);
    }
    Ok(op)
}

// Firewalls

pub async fn get_firewall(client: &MockGcpClient, project: &str, name: &str) -> Result<Firewall, GcpError> {
    client.begin("get_firewall", name)?;
    lock(&client.firewalls)
        .get(&format!("{}/{}", project, name))
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("Firewall {} not found", name)))
}

pub async fn insert_firewall(
    client: &MockGcpClient,
    project: &str,
    firewall: &Firewall,
) -> Result<ComputeOperation, GcpError> {
    client.begin("insert_firewall", &firewall.name)?;
    let key = format!("{}/{}", project, firewall.name);
    if lock(&client.firewalls).contains_key(&key) {
        return Err(already_exists("compute#firewall", &firewall.name));
    }
    let mut stored = firewall.clone();
    let target = format!(
        "{}/projects/{}/global/firewalls/{}",
        client.compute_base, project, firewall.name
    );
    stored.self_link = Some(target.clone());
    let (op, apply) = start_operation(client, "insert", &target, None);
    if apply {
        lock(&client.firewalls).insert(key, stored);
    }
    Ok(op)
}

pub async fn delete_firewall(client: &MockGcpClient, project: &str, name: &str) -> Result<ComputeOperation, GcpError> {
    client.begin("delete_firewall", name)?;
    let key = format!("{}/{}", project, name);
    let target = lock(&client.firewalls)
        .get(&key)
        .and_then(|f| f.self_link.clone())
        .ok_or_else(|| GcpError::NotFound(format!("Firewall {} not found", name)))?;
    let (op, apply) = start_operation(client, "delete", &target, None);
    if apply {
        lock(&client.firewalls).remove(&key);
    }
    Ok(op)
}
