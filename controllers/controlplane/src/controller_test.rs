//! Unit tests for the controlplane orchestrator

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::reconciler::kms::crypto_key::{DECRYPTER_ROLE, ENCRYPTER_ROLE};
    use crate::test_utils::*;
    use gcp_client::{ClusterManagerClientTrait, CryptoKeyVersionState, KmsClientTrait, MockGcpClient};
    use tokio_util::sync::CancellationToken;

    const CLUSTER_NAME: &str = "projects/demo-project/locations/us-central1/clusters/demo-controlplane";
    const KEY_RING_NAME: &str = "projects/demo-project/locations/us-central1/keyRings/demo-controlplane";
    const KEY_NAME: &str = "projects/demo-project/locations/us-central1/keyRings/demo-controlplane/cryptoKeys/demo-controlplane";

    fn controller(mock: &MockGcpClient) -> ControlplaneController {
        ControlplaneController::new(test_clients(mock), test_poller(), test_key_version_settings())
    }

    fn assert_in_order(mock: &MockGcpClient, calls: &[&str]) {
        let positions: Vec<usize> = calls
            .iter()
            .map(|call| {
                mock.position(call)
                    .unwrap_or_else(|| panic!("{} was not called; calls: {:?}", call, mock.calls()))
            })
            .collect();
        for (pair, window) in calls.windows(2).zip(positions.windows(2)) {
            assert!(window[0] < window[1], "{} should come before {}", pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn test_create_follows_dependency_order() {
        // Setup
        let mock = MockGcpClient::new();
        mock.set_polls_until_done(1);
        let config = test_config();

        // Execute
        let provisioned = controller(&mock).create(&config).await.unwrap();

        // Assert
        assert_in_order(
            &mock,
            &[
                "insert_network demo",
                "insert_subnetwork demo-controlplane",
                "insert_router demo",
                "create_key_ring demo-controlplane",
                "create_crypto_key demo-controlplane",
                "set_iam_policy demo-controlplane",
                "create_cluster demo-controlplane",
                "insert_firewall demo-intra-cluster-egress",
            ],
        );
        assert_in_order(&mock, &["create_cluster demo-controlplane", "insert_firewall demo-webhooks"]);

        let status = provisioned.status();
        assert_eq!(status.phase, crds::ControlplanePhase::Ready);
        assert_eq!(
            status.network_self_link.as_deref(),
            Some("https://www.googleapis.com/compute/v1/projects/demo-project/global/networks/demo")
        );
        assert_eq!(provisioned.subnetwork.network, status.network_self_link.clone().unwrap());
        assert_eq!(status.crypto_key.as_deref(), Some(KEY_NAME));
        assert_eq!(status.primary_key_version.as_deref(), Some("1 (ENABLED)"));
        assert_eq!(status.firewall_self_links.len(), 2);
        assert_eq!(status.service_agent, Some(config.crypto_key.service_agent.clone()));

        let cluster = mock.cluster(CLUSTER_NAME).unwrap();
        assert_eq!(cluster.subnetwork, "demo-controlplane");
        assert_eq!(cluster.database_encryption.unwrap().key_name, KEY_NAME);
    }

    #[tokio::test]
    async fn test_create_twice_mutates_once() {
        let mock = MockGcpClient::new();
        let controller = controller(&mock);
        let config = test_config();

        controller.create(&config).await.unwrap();
        controller.create(&config).await.unwrap();

        for call in [
            "insert_network demo",
            "insert_subnetwork demo-controlplane",
            "insert_router demo",
            "create_key_ring demo-controlplane",
            "create_crypto_key demo-controlplane",
            "create_cluster demo-controlplane",
            "insert_firewall demo-intra-cluster-egress",
            "insert_firewall demo-webhooks",
        ] {
            assert_eq!(mock.call_count(call), 1, "{}", call);
        }
    }

    #[tokio::test]
    async fn test_failed_create_resumes_where_it_stopped() {
        // Setup: the router insert is rejected once
        let mock = MockGcpClient::new();
        let controller = controller(&mock);
        let config = test_config();
        mock.fail_next_call("insert_router", "backend unavailable");

        // Execute: the first run stops at the router
        let err = controller.create(&config).await.unwrap_err();
        assert!(matches!(err, ControllerError::Transient(_)), "got {:?}", err);
        assert_eq!(mock.call_count("create_key_ring demo-controlplane"), 0);
        assert_eq!(mock.call_count("create_cluster demo-controlplane"), 0);

        // Execute: the retry converges
        controller.create(&config).await.unwrap();

        // Assert: earlier stages were not recreated
        assert_eq!(mock.call_count("insert_network demo"), 1);
        assert_eq!(mock.call_count("insert_subnetwork demo-controlplane"), 1);
        assert_eq!(mock.call_count("insert_router demo"), 2);
        assert!(mock.cluster(CLUSTER_NAME).is_some());
    }

    #[tokio::test]
    async fn test_failed_subnetwork_operation_stops_the_pass() {
        let mock = MockGcpClient::new();
        mock.fail_operation_for("demo-controlplane", "Insufficient regional quota");
        let config = test_config();

        let err = controller(&mock).create(&config).await.unwrap_err();

        assert!(matches!(err, ControllerError::OperationFailed { .. }), "got {:?}", err);
        assert_eq!(mock.call_count("insert_router demo"), 0);
        assert_eq!(mock.call_count("insert_firewall demo-webhooks"), 0);
    }

    #[tokio::test]
    async fn test_delete_runs_in_reverse_order() {
        // Setup
        let mock = MockGcpClient::new();
        let controller = controller(&mock);
        let config = test_config();
        controller.create(&config).await.unwrap();
        mock.clear_calls();

        // Execute
        controller.delete(&config).await.unwrap();

        // Assert
        assert_in_order(
            &mock,
            &[
                "delete_firewall demo-intra-cluster-egress",
                "delete_cluster demo-controlplane",
                "set_iam_policy demo-controlplane",
                "delete_router demo",
                "delete_subnetwork demo-controlplane",
                "delete_network demo",
            ],
        );
        assert_in_order(&mock, &["delete_firewall demo-webhooks", "delete_cluster demo-controlplane"]);
        assert!(mock.calls().iter().all(|c| !c.contains("key_ring")));
        assert!(mock.cluster(CLUSTER_NAME).is_none());
    }

    #[tokio::test]
    async fn test_delete_with_existing_key_keeps_key_material() {
        // Setup: an ENABLED key with the service agent granted
        let mock = MockGcpClient::new();
        let controller = controller(&mock);
        let config = test_config();
        controller.create(&config).await.unwrap();
        let agent = config.crypto_key.service_agent.clone();
        assert!(mock.iam_policy(KEY_NAME).unwrap().has_member(ENCRYPTER_ROLE, &agent));

        // Execute
        controller.delete(&config).await.unwrap();

        // Assert
        let policy = mock.iam_policy(KEY_NAME).unwrap();
        assert!(!policy.has_member(ENCRYPTER_ROLE, &agent));
        assert!(!policy.has_member(DECRYPTER_ROLE, &agent));
        assert!(mock.get_key_ring(KEY_RING_NAME).await.is_ok());
        let key = mock.get_crypto_key(KEY_NAME).await.unwrap();
        assert_eq!(key.primary.map(|v| v.state), Some(CryptoKeyVersionState::Enabled));
        assert_in_order(
            &mock,
            &[
                "delete_cluster demo-controlplane",
                "delete_router demo",
                "delete_subnetwork demo-controlplane",
                "delete_network demo",
            ],
        );
    }

    #[tokio::test]
    async fn test_delete_of_nothing_is_noop() {
        let mock = MockGcpClient::new();

        controller(&mock).delete(&test_config()).await.unwrap();

        assert!(
            mock.calls().iter().all(|c| c.starts_with("get_")),
            "unexpected mutation: {:?}",
            mock.calls()
        );
    }

    #[tokio::test]
    async fn test_update_of_missing_cluster_is_precondition_failure() {
        // Setup: everything exists except the cluster
        let mock = MockGcpClient::new();
        let controller = controller(&mock);
        let config = test_config();
        controller.create(&config).await.unwrap();
        mock.delete_cluster(CLUSTER_NAME).await.unwrap();

        // Execute
        let err = controller.update(&config).await.unwrap_err();

        // Assert: update never creates
        assert!(matches!(err, ControllerError::PreconditionFailed(_)), "got {:?}", err);
        assert_eq!(mock.call_count("create_cluster demo-controlplane"), 1);
        assert_eq!(mock.call_count("update_cluster demo-controlplane"), 0);
    }

    #[tokio::test]
    async fn test_update_never_reports_not_found() {
        // Setup: the cluster survives but its default pool is gone
        let mock = MockGcpClient::new();
        let controller = controller(&mock);
        let config = test_config();
        controller.create(&config).await.unwrap();
        let mut cluster = mock.cluster(CLUSTER_NAME).unwrap();
        cluster.node_pools.clear();
        mock.add_cluster(CLUSTER_NAME, cluster);

        // Execute
        let err = controller.update(&config).await.unwrap_err();

        // Assert
        assert!(matches!(err, ControllerError::PreconditionFailed(_)), "got {:?}", err);
        assert_eq!(mock.call_count("insert_firewall demo-webhooks"), 1);
    }

    #[tokio::test]
    async fn test_update_of_empty_project_touches_nothing() {
        let mock = MockGcpClient::new();

        let err = controller(&mock).update(&test_config()).await.unwrap_err();

        assert!(matches!(err, ControllerError::PreconditionFailed(_)));
        assert_eq!(mock.calls(), vec!["get_network demo".to_string()]);
    }

    #[tokio::test]
    async fn test_update_reenables_key_before_cluster_update() {
        // Setup: the primary was disabled out of band
        let mock = MockGcpClient::new();
        let controller = controller(&mock);
        let config = test_config();
        let provisioned = controller.create(&config).await.unwrap();
        let primary = provisioned.crypto_key.primary.unwrap().name;
        assert!(mock.set_key_version_state(&primary, CryptoKeyVersionState::Disabled));
        mock.clear_calls();

        // Execute
        let updated = controller.update(&config).await.unwrap();

        // Assert
        assert_eq!(mock.key_version_state(&primary), Some(CryptoKeyVersionState::Enabled));
        assert_eq!(updated.status().primary_key_version.as_deref(), Some("1 (ENABLED)"));
        assert_in_order(
            &mock,
            &[
                "update_crypto_key_version 1",
                "set_iam_policy demo-controlplane",
                "update_cluster demo-controlplane",
                "update_node_pool default-pool",
            ],
        );
        assert_eq!(mock.call_count("insert_network demo"), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_makes_no_calls() {
        let mock = MockGcpClient::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let controller = ControlplaneController::new(
            test_clients(&mock),
            OperationPoller::new(test_poll_settings(), cancel),
            test_key_version_settings(),
        );

        let err = controller.create(&test_config()).await.unwrap_err();

        assert!(matches!(err, ControllerError::Cancelled));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_enable_apis_and_project_number() {
        let mock = MockGcpClient::new();
        mock.add_project(TEST_PROJECT, TEST_PROJECT_NUMBER);
        let controller = controller(&mock);

        controller.enable_apis(TEST_PROJECT).await.unwrap();
        let number = controller.project_number(TEST_PROJECT).await.unwrap();

        assert_eq!(number, TEST_PROJECT_NUMBER);
        assert_eq!(mock.enabled_services("projects/demo-project").len(), 4);
    }
}
