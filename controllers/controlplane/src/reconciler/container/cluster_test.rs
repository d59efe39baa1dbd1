//! Unit tests for the Cluster reconciler

#[cfg(test)]
mod tests {
    use super::super::cluster::ClusterResource;
    use crate::error::ControllerError;
    use crate::reconciler::{CryptoKeyRef, NetworkRef, ProvisionedResource, SubnetworkRef};
    use crate::test_utils::*;
    use gcp_client::{Cluster, MockGcpClient, NodeConfig, NodePool};
    use std::sync::Arc;

    const CLUSTER_NAME: &str = "projects/demo-project/locations/us-central1/clusters/demo-controlplane";
    const KEY_NAME: &str = "projects/demo-project/locations/us-central1/keyRings/demo-controlplane/cryptoKeys/demo-controlplane";

    fn cluster(mock: &MockGcpClient) -> ClusterResource {
        ClusterResource::new(
            test_config().cluster,
            NetworkRef::derived(TEST_PROJECT, "demo"),
            SubnetworkRef {
                name: "demo-controlplane".to_string(),
                self_link: "https://www.googleapis.com/compute/v1/projects/demo-project/regions/us-central1/subnetworks/demo-controlplane".to_string(),
            },
            CryptoKeyRef {
                name: KEY_NAME.to_string(),
            },
            Arc::new(mock.clone()),
            test_poller(),
        )
    }

    #[tokio::test]
    async fn test_create_private_encrypted_cluster() {
        // Setup
        let mock = MockGcpClient::new();
        let resource = cluster(&mock);
        let spec = test_config().cluster;

        // Execute
        resource.create().await.unwrap();

        // Assert
        let stored = mock.cluster(CLUSTER_NAME).unwrap();
        assert_eq!(stored.network, "demo");
        assert_eq!(stored.subnetwork, "demo-controlplane");
        let encryption = stored.database_encryption.unwrap();
        assert_eq!(encryption.state, "ENCRYPTED");
        assert_eq!(encryption.key_name, KEY_NAME);
        let private = stored.private_cluster_config.unwrap();
        assert!(private.enable_private_nodes);
        assert_eq!(private.master_ipv4_cidr_block, "172.16.0.0/28");
        assert_eq!(
            stored.workload_identity_config.unwrap().workload_pool,
            "demo-project.svc.id.goog"
        );
        assert_eq!(stored.release_channel.unwrap().channel, "REGULAR");

        let ip_policy = stored.ip_allocation_policy.unwrap();
        assert_eq!(ip_policy.cluster_secondary_range_name.as_deref(), Some("pods"));
        assert_eq!(ip_policy.services_secondary_range_name.as_deref(), Some("services"));

        assert_eq!(stored.node_pools.len(), 1);
        let pool = &stored.node_pools[0];
        assert_eq!(pool.name, "default-pool");
        let autoscaling = pool.autoscaling.clone().unwrap();
        assert_eq!(autoscaling.min_node_count, spec.min_node_count);
        assert_eq!(autoscaling.max_node_count, spec.max_node_count);
        let config = pool.config.clone().unwrap();
        assert_eq!(config.machine_type, spec.machine_type);
        assert_eq!(config.disk_type.as_deref(), Some("pd-ssd"));
        assert_eq!(config.tags, vec!["default-pool"]);
        assert_eq!(config.oauth_scopes.len(), 7);
        assert_eq!(config.workload_metadata_config.unwrap().mode, "GKE_METADATA");
    }

    #[tokio::test]
    async fn test_create_polls_regional_operation() {
        let mock = MockGcpClient::new();
        mock.set_polls_until_done(2);
        let resource = cluster(&mock);

        resource.create().await.unwrap();

        assert_eq!(mock.call_count("get_operation operation-1-create_cluster"), 2);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let mock = MockGcpClient::new();
        let resource = cluster(&mock);

        resource.create().await.unwrap();
        resource.create().await.unwrap();

        assert_eq!(mock.call_count("create_cluster demo-controlplane"), 1);
    }

    #[tokio::test]
    async fn test_create_without_crypto_key_is_rejected() {
        let mock = MockGcpClient::new();
        let resource = ClusterResource::new(
            test_config().cluster,
            NetworkRef::derived(TEST_PROJECT, "demo"),
            SubnetworkRef {
                name: "demo-controlplane".to_string(),
                self_link: String::new(),
            },
            CryptoKeyRef { name: String::new() },
            Arc::new(mock.clone()),
            test_poller(),
        );

        let err = resource.create().await.unwrap_err();

        assert!(matches!(err, ControllerError::PreconditionFailed(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_runs_cluster_stage_before_node_pool_stage() {
        // Setup: each operation needs one lookup
        let mock = MockGcpClient::new();
        mock.set_polls_until_done(1);
        let resource = cluster(&mock);
        resource.create().await.unwrap();
        mock.clear_calls();

        // Execute
        resource.update().await.unwrap();

        // Assert
        let cluster_stage = mock.position("update_cluster demo-controlplane").unwrap();
        let cluster_done = mock.position("get_operation operation-2-update_cluster").unwrap();
        let pool_stage = mock.position("update_node_pool default-pool").unwrap();
        let pool_done = mock.position("get_operation operation-3-upgrade_nodes").unwrap();
        assert!(cluster_stage < cluster_done);
        assert!(cluster_done < pool_stage);
        assert!(pool_stage < pool_done);
    }

    #[tokio::test]
    async fn test_update_reasserts_drifted_configuration() {
        // Setup: a cluster created elsewhere, without the hardening
        let mock = MockGcpClient::new();
        mock.add_cluster(
            CLUSTER_NAME,
            Cluster {
                name: "demo-controlplane".to_string(),
                node_pools: vec![NodePool {
                    name: "default-pool".to_string(),
                    config: Some(NodeConfig {
                        image_type: Some("UBUNTU_CONTAINERD".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        let resource = cluster(&mock);

        // Execute
        let updated = resource.update().await.unwrap();

        // Assert
        assert!(updated.binary_authorization.unwrap().enabled);
        assert!(updated.shielded_nodes.unwrap().enabled);
        assert!(updated.master_authorized_networks_config.unwrap().enabled);
        assert!(updated.network_config.unwrap().enable_intra_node_visibility);
        let pool = &updated.node_pools[0];
        assert!(pool.autoscaling.clone().unwrap().enabled);
        assert_eq!(pool.upgrade_settings.clone().unwrap().max_surge, 1);
        let config = pool.config.clone().unwrap();
        // The live image type is kept
        assert_eq!(config.image_type.as_deref(), Some("UBUNTU_CONTAINERD"));
        assert_eq!(config.tags, vec!["default-pool"]);
        assert_eq!(config.workload_metadata_config.unwrap().mode, "GKE_METADATA");
    }

    #[tokio::test]
    async fn test_update_without_default_pool_is_precondition_failure() {
        // Setup: the default pool was removed out of band
        let mock = MockGcpClient::new();
        mock.add_cluster(
            CLUSTER_NAME,
            Cluster {
                name: "demo-controlplane".to_string(),
                ..Default::default()
            },
        );
        let resource = cluster(&mock);

        // Execute
        let err = resource.update().await.unwrap_err();

        // Assert
        assert!(
            matches!(err, ControllerError::PreconditionFailed(ref m) if m.contains("default-pool")),
            "got {:?}",
            err
        );
        assert_eq!(mock.call_count("update_cluster demo-controlplane"), 1);
        assert_eq!(mock.call_count("update_node_pool default-pool"), 1);
    }

    #[tokio::test]
    async fn test_failed_cluster_stage_skips_node_pool_stage() {
        let mock = MockGcpClient::new();
        let resource = cluster(&mock);
        resource.create().await.unwrap();
        mock.fail_operation_for("demo-controlplane", "Precondition check failed");

        let err = resource.update().await.unwrap_err();

        match err {
            ControllerError::OperationFailed { message, .. } => assert_eq!(message, "Precondition check failed"),
            other => panic!("expected OperationFailed, got {:?}", other),
        }
        assert_eq!(mock.call_count("update_node_pool default-pool"), 0);
    }

    #[tokio::test]
    async fn test_update_requires_existing_cluster() {
        let mock = MockGcpClient::new();
        let resource = cluster(&mock);

        let err = resource.update().await.unwrap_err();

        assert!(matches!(err, ControllerError::PreconditionFailed(_)));
        assert_eq!(mock.call_count("update_cluster demo-controlplane"), 0);
    }

    #[tokio::test]
    async fn test_delete_cluster() {
        let mock = MockGcpClient::new();
        let resource = cluster(&mock);
        resource.create().await.unwrap();

        resource.delete().await.unwrap();
        resource.delete().await.unwrap();

        assert!(mock.cluster(CLUSTER_NAME).is_none());
        assert_eq!(mock.call_count("delete_cluster demo-controlplane"), 1);
    }
}
