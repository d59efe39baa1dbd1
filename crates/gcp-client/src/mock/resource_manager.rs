//! Resource manager and service usage operations for MockGcpClient

use super::MockGcpClient;
use super::helpers::{MockOperation, lock};
use crate::error::GcpError;
use crate::models::*;

fn to_long_running(name: &str, op: &MockOperation) -> LongRunningOperation {
    let done = op.is_done();
    LongRunningOperation {
        name: name.to_string(),
        done,
        error: op.error.as_ref().filter(|_| done).map(|message| Status {
            code: 7,
            message: message.clone(),
        }),
        response: None,
    }
}

pub async fn get_project(client: &MockGcpClient, project_id: &str) -> Result<Project, GcpError> {
    client.begin("get_project", project_id)?;
    lock(&client.projects)
        .get(project_id)
        .cloned()
        .ok_or_else(|| GcpError::NotFound(format!("Project {} not found", project_id)))
}

pub async fn batch_enable_services(
    client: &MockGcpClient,
    parent: &str,
    services: &[String],
) -> Result<LongRunningOperation, GcpError> {
    client.begin("batch_enable_services", parent)?;
    if services.is_empty() {
        return Err(GcpError::InvalidRequest("no services to enable".to_string()));
    }

    let op = client.new_operation("batchEnable", parent, None);
    if op.error.is_none() {
        let mut enabled = lock(&client.enabled_services);
        let entry = enabled.entry(parent.to_string()).or_default();
        for service in services {
            if !entry.contains(service) {
                entry.push(service.clone());
            }
        }
    }

    let name = format!("operations/acf.{}", uuid::Uuid::new_v4());
    let response = to_long_running(&name, &op);
    lock(&client.service_operations).insert(name, op);
    Ok(response)
}

pub async fn get_service_operation(client: &MockGcpClient, name: &str) -> Result<LongRunningOperation, GcpError> {
    client.begin("get_service_operation", name)?;
    let mut operations = lock(&client.service_operations);
    let op = operations
        .get_mut(name)
        .ok_or_else(|| GcpError::NotFound(format!("Operation {} not found", name)))?;
    op.poll();
    Ok(to_long_running(name, op))
}
