//! Unit tests for the Subnetwork reconciler

#[cfg(test)]
mod tests {
    use super::super::subnetwork::SubnetworkResource;
    use crate::error::ControllerError;
    use crate::reconciler::{NetworkRef, ProvisionedResource};
    use crate::test_utils::*;
    use gcp_client::MockGcpClient;
    use std::sync::Arc;

    fn subnetwork(mock: &MockGcpClient, network: NetworkRef) -> SubnetworkResource {
        SubnetworkResource::new(test_config().subnetwork, network, Arc::new(mock.clone()), test_poller())
    }

    #[tokio::test]
    async fn test_create_references_network() {
        // Setup
        let mock = MockGcpClient::new();
        mock.set_polls_until_done(1);
        let network = create_test_network(&mock);
        let resource = subnetwork(&mock, network.clone());

        // Execute
        let created = resource.create().await.unwrap();

        // Assert
        assert_eq!(created.name, "demo-controlplane");
        assert_eq!(created.network, network.self_link);
        assert_eq!(created.ip_cidr_range, "10.0.0.0/24");
        assert_eq!(created.private_ip_google_access, Some(true));
        let ranges: Vec<(&str, &str)> = created
            .secondary_ip_ranges
            .iter()
            .map(|r| (r.range_name.as_str(), r.ip_cidr_range.as_str()))
            .collect();
        assert_eq!(ranges, vec![("pods", "10.1.0.0/16"), ("services", "10.2.0.0/20")]);
        assert_eq!(mock.call_count("get_region_operation operation-1-insert"), 1);
    }

    #[tokio::test]
    async fn test_create_without_network_fails() {
        let mock = MockGcpClient::new();
        let resource = subnetwork(&mock, NetworkRef::derived(TEST_PROJECT, "demo"));

        let err = resource.create().await.unwrap_err();

        assert!(matches!(err, ControllerError::Transient(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let mock = MockGcpClient::new();
        let resource = subnetwork(&mock, create_test_network(&mock));

        resource.create().await.unwrap();
        resource.create().await.unwrap();

        assert_eq!(mock.call_count("insert_subnetwork demo-controlplane"), 1);
    }

    #[tokio::test]
    async fn test_update_requires_existing_subnetwork() {
        let mock = MockGcpClient::new();
        let resource = subnetwork(&mock, create_test_network(&mock));

        assert!(matches!(
            resource.update().await,
            Err(ControllerError::PreconditionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_subnetwork() {
        let mock = MockGcpClient::new();
        let resource = subnetwork(&mock, create_test_network(&mock));
        resource.create().await.unwrap();

        resource.delete().await.unwrap();

        assert!(!resource.exists().await.unwrap());
    }
}
