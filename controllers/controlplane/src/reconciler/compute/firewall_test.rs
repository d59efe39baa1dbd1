//! Unit tests for the Firewall reconciler

#[cfg(test)]
mod tests {
    use super::super::firewall::FirewallResource;
    use crate::error::ControllerError;
    use crate::reconciler::ProvisionedResource;
    use crate::test_utils::*;
    use gcp_client::{FirewallDirection, MockGcpClient};
    use std::sync::Arc;

    fn firewalls(mock: &MockGcpClient) -> Vec<FirewallResource> {
        let network = create_test_network(mock);
        test_config()
            .firewalls
            .into_iter()
            .map(|spec| FirewallResource::new(spec, network.clone(), Arc::new(mock.clone()), test_poller()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_egress_and_ingress_rules() {
        // Setup
        let mock = MockGcpClient::new();
        let resources = firewalls(&mock);

        // Execute
        let egress = resources[0].create().await.unwrap();
        let webhooks = resources[1].create().await.unwrap();

        // Assert
        assert_eq!(egress.direction, FirewallDirection::Egress);
        assert!(egress.source_ranges.is_empty());
        assert_eq!(egress.destination_ranges.len(), 3);
        assert_eq!(webhooks.direction, FirewallDirection::Ingress);
        assert_eq!(webhooks.source_ranges, vec!["172.16.0.0/28"]);
        assert_eq!(webhooks.allowed[0].ports, vec!["8443", "9443", "15017"]);
        for firewall in [&egress, &webhooks] {
            assert!(firewall.network.ends_with("/global/networks/demo"));
            assert_eq!(firewall.target_tags, vec!["default-pool"]);
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let mock = MockGcpClient::new();
        let resources = firewalls(&mock);

        resources[1].create().await.unwrap();
        resources[1].create().await.unwrap();

        assert_eq!(mock.call_count("insert_firewall demo-webhooks"), 1);
    }

    #[tokio::test]
    async fn test_update_requires_existing_firewall() {
        let mock = MockGcpClient::new();
        let resources = firewalls(&mock);

        let err = resources[0].update().await.unwrap_err();

        assert!(matches!(err, ControllerError::PreconditionFailed(_)));
        assert_eq!(mock.call_count("insert_firewall demo-intra-cluster-egress"), 0);
    }

    #[tokio::test]
    async fn test_delete_firewall() {
        let mock = MockGcpClient::new();
        let resources = firewalls(&mock);
        resources[0].create().await.unwrap();

        resources[0].delete().await.unwrap();
        resources[0].delete().await.unwrap();

        assert!(!resources[0].exists().await.unwrap());
        assert_eq!(mock.call_count("delete_firewall demo-intra-cluster-egress"), 1);
    }
}
