//! Project boundary: API enablement and project number lookup

use crate::error::ControllerError;
use crate::poller::OperationPoller;
use gcp_client::{ProjectsClientTrait, ServiceUsageClientTrait};
use tracing::info;

/// Services the controlplane needs on the project
pub const REQUIRED_SERVICES: [&str; 4] = [
    "cloudkms.googleapis.com",
    "compute.googleapis.com",
    "container.googleapis.com",
    "iam.googleapis.com",
];

/// Numeric project number of `project_id`
///
/// The GKE service agent is named after it.
pub async fn resolve_project_number(
    client: &dyn ProjectsClientTrait,
    poller: &OperationPoller,
    project_id: &str,
) -> Result<String, ControllerError> {
    let project = poller.lookup(client.get_project(project_id)).await.map_err(|e| match e {
        ControllerError::NotFound(_) => ControllerError::PreconditionFailed(format!(
            "project {} does not exist or is not visible to this account",
            project_id
        )),
        other => other,
    })?;
    let number = project.project_number().ok_or_else(|| {
        ControllerError::PreconditionFailed(format!(
            "project {} reported an unexpected name {:?}",
            project_id, project.name
        ))
    })?;
    info!("Project {} has number {}", project_id, number);
    Ok(number.to_string())
}

/// Batch-enable [`REQUIRED_SERVICES`] and wait for the operation
///
/// Enabling an already enabled service is a no-op at the provider, so this
/// runs before every create and update.
pub async fn enable_required_apis(
    client: &dyn ServiceUsageClientTrait,
    poller: &OperationPoller,
    project_id: &str,
) -> Result<(), ControllerError> {
    let parent = format!("projects/{}", project_id);
    let services: Vec<String> = REQUIRED_SERVICES.iter().map(|s| s.to_string()).collect();

    info!("Enabling {} on {}", services.join(", "), parent);
    let op = poller.request(client.batch_enable_services(&parent, &services)).await?;
    let op_name = op.name.clone();
    poller.wait(op, || client.get_service_operation(&op_name)).await?;
    info!("Required APIs enabled on {}", parent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use gcp_client::MockGcpClient;

    #[tokio::test]
    async fn test_resolve_project_number() {
        let mock = MockGcpClient::new();
        mock.add_project(TEST_PROJECT, TEST_PROJECT_NUMBER);

        let number = resolve_project_number(&mock, &test_poller(), TEST_PROJECT).await.unwrap();

        assert_eq!(number, TEST_PROJECT_NUMBER);
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let mock = MockGcpClient::new();

        let err = resolve_project_number(&mock, &test_poller(), "missing").await.unwrap_err();

        assert!(
            matches!(err, ControllerError::PreconditionFailed(ref m) if m.contains("project missing")),
            "got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_enable_required_apis() {
        let mock = MockGcpClient::new();
        mock.set_polls_until_done(2);

        enable_required_apis(&mock, &test_poller(), TEST_PROJECT).await.unwrap();

        let enabled = mock.enabled_services("projects/demo-project");
        for service in REQUIRED_SERVICES {
            assert!(enabled.iter().any(|s| s == service), "{} not enabled", service);
        }
        assert_eq!(mock.call_count("batch_enable_services demo-project"), 1);
    }

    #[tokio::test]
    async fn test_failed_enablement_is_reported() {
        let mock = MockGcpClient::new();
        mock.fail_operation_for("demo-project", "Billing account for project is not found");

        let err = enable_required_apis(&mock, &test_poller(), TEST_PROJECT).await.unwrap_err();

        assert!(matches!(err, ControllerError::OperationFailed { .. }));
        assert!(mock.enabled_services("projects/demo-project").is_empty());
    }
}
