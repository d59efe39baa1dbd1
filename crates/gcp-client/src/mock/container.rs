//! GKE operations for MockGcpClient
//!
//! Handles clusters, node pools and container operations

use super::MockGcpClient;
use super::helpers::{MockOperation, lock, short_name, split_node_pool_name};
use crate::error::GcpError;
use crate::models::*;

/// Image type GKE assigns when a node pool does not ask for one
const DEFAULT_IMAGE_TYPE: &str = "COS_CONTAINERD";

fn to_container_operation(name: &str, op: &MockOperation) -> ContainerOperation {
    let done = op.is_done();
    ContainerOperation {
        name: name.to_string(),
        status: if done {
            ContainerOperationStatus::Done
        } else {
            ContainerOperationStatus::Running
        },
        operation_type: Some(op.operation_type.clone()),
        status_message: op.error.clone().filter(|_| done),
        target_link: Some(op.target.clone()),
        error: op.error.as_ref().filter(|_| done).map(|message| Status {
            code: 9,
            message: message.clone(),
        }),
    }
}

fn start_operation(client: &MockGcpClient, operation_type: &str, target: &str) -> (ContainerOperation, bool) {
    let op = client.new_operation(operation_type, target, None);
    let apply = op.error.is_none();
    let name = format!("operation-{}-{}", client.next_id(), operation_type.to_lowercase());
    let response = to_container_operation(&name, &op);
    lock(&client.container_operations).insert(name, op);
    (response, apply)
}

fn not_found(name: &str) -> GcpError {
    GcpError::NotFound(format!("Cluster {} not found", name))
}

pub async fn get_cluster(client: &MockGcpClient, name: &str) -> Result<Cluster, GcpError> {
    client.begin("get_cluster", name)?;
    lock(&client.clusters).get(name).cloned().ok_or_else(|| not_found(name))
}

pub async fn create_cluster(
    client: &MockGcpClient,
    parent: &str,
    cluster: &Cluster,
) -> Result<ContainerOperation, GcpError> {
    client.begin("create_cluster", &cluster.name)?;
    let name = format!("{}/clusters/{}", parent, cluster.name);
    if lock(&client.clusters).contains_key(&name) {
        return Err(GcpError::Api {
            status: 409,
            message: format!("Already exists: {}", name),
        });
    }

    let mut stored = cluster.clone();
    stored.self_link = Some(format!("https://container.googleapis.com/v1/{}", name));
    stored.status = Some("RUNNING".to_string());
    for pool in &mut stored.node_pools {
        pool.status = Some("RUNNING".to_string());
        if let Some(config) = pool.config.as_mut() {
            config.image_type.get_or_insert_with(|| DEFAULT_IMAGE_TYPE.to_string());
        }
    }

    let (op, apply) = start_operation(client, "CREATE_CLUSTER", &name);
    if apply {
        lock(&client.clusters).insert(name, stored);
    }
    Ok(op)
}

pub async fn update_cluster(
    client: &MockGcpClient,
    name: &str,
    update: &ClusterUpdate,
) -> Result<ContainerOperation, GcpError> {
    client.begin("update_cluster", name)?;
    if !lock(&client.clusters).contains_key(name) {
        return Err(not_found(name));
    }
    let (op, apply) = start_operation(client, "UPDATE_CLUSTER", name);
    if !apply {
        return Ok(op);
    }

    let mut clusters = lock(&client.clusters);
    let cluster = clusters.get_mut(name).ok_or_else(|| not_found(name))?;
    if let Some(addons) = &update.desired_addons_config {
        cluster.addons_config = Some(addons.clone());
    }
    if let Some(autoscaling) = &update.desired_node_pool_autoscaling {
        let pool_id = update.desired_node_pool_id.as_deref().unwrap_or_default();
        if let Some(pool) = cluster.node_pools.iter_mut().find(|p| p.name == pool_id) {
            pool.autoscaling = Some(autoscaling.clone());
        }
    }
    if let Some(networks) = &update.desired_master_authorized_networks_config {
        cluster.master_authorized_networks_config = Some(networks.clone());
    }
    if let Some(binary_authorization) = &update.desired_binary_authorization {
        cluster.binary_authorization = Some(binary_authorization.clone());
    }
    if let Some(visibility) = &update.desired_intra_node_visibility_config {
        cluster.network_config = Some(NetworkConfig {
            enable_intra_node_visibility: visibility.enabled,
        });
    }
    if let Some(channel) = &update.desired_release_channel {
        cluster.release_channel = Some(channel.clone());
    }
    if let Some(private) = &update.desired_private_cluster_config {
        cluster.private_cluster_config = Some(private.clone());
    }
    if let Some(shielded) = &update.desired_shielded_nodes {
        cluster.shielded_nodes = Some(shielded.clone());
    }
    Ok(op)
}

pub async fn update_node_pool(
    client: &MockGcpClient,
    request: &UpdateNodePoolRequest,
) -> Result<ContainerOperation, GcpError> {
    let (cluster_name, pool_id) = split_node_pool_name(&request.name)
        .ok_or_else(|| GcpError::InvalidRequest(format!("invalid node pool name {}", request.name)))?;
    client.begin("update_node_pool", pool_id)?;

    let exists = lock(&client.clusters)
        .get(cluster_name)
        .is_some_and(|c| c.node_pools.iter().any(|p| p.name == pool_id));
    if !exists {
        return Err(GcpError::NotFound(format!("NodePool {} not found", request.name)));
    }

    // Operation failures for node pools are keyed by the owning cluster
    let (op, apply) = start_operation(client, "UPGRADE_NODES", cluster_name);
    if !apply {
        return Ok(op);
    }

    let mut clusters = lock(&client.clusters);
    if let Some(pool) = clusters
        .get_mut(cluster_name)
        .and_then(|c| c.node_pools.iter_mut().find(|p| p.name == pool_id))
    {
        let config = pool.config.get_or_insert_with(NodeConfig::default);
        config.image_type = Some(request.image_type.clone());
        if let Some(metadata) = &request.workload_metadata_config {
            config.workload_metadata_config = Some(metadata.clone());
        }
        if let Some(tags) = &request.tags {
            config.tags = tags.tags.clone();
        }
        if let Some(settings) = &request.upgrade_settings {
            pool.upgrade_settings = Some(settings.clone());
        }
    }
    Ok(op)
}

pub async fn delete_cluster(client: &MockGcpClient, name: &str) -> Result<ContainerOperation, GcpError> {
    client.begin("delete_cluster", name)?;
    if !lock(&client.clusters).contains_key(name) {
        return Err(not_found(name));
    }
    let (op, apply) = start_operation(client, "DELETE_CLUSTER", name);
    if apply {
        lock(&client.clusters).remove(name);
    }
    Ok(op)
}

pub async fn get_operation(client: &MockGcpClient, name: &str) -> Result<ContainerOperation, GcpError> {
    client.begin("get_operation", name)?;
    let id = short_name(name);
    let mut operations = lock(&client.container_operations);
    let op = operations
        .get_mut(id)
        .ok_or_else(|| GcpError::NotFound(format!("Operation {} not found", name)))?;
    op.poll();
    Ok(to_container_operation(id, op))
}
