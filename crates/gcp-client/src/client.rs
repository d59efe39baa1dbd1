//! Google Cloud REST client
//!
//! Implements every capability trait against the public JSON APIs.
//! Compute resources are addressed by project/region/name, KMS and GKE
//! resources by their full resource names.

use crate::common::{Endpoints, HttpClient};
use crate::error::GcpError;
use crate::gcp_trait::*;
use crate::models::*;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Google Cloud REST client
#[derive(Debug)]
pub struct GcpClient {
    http: HttpClient,
    endpoints: Endpoints,
}

impl GcpClient {
    /// Create a client against the production endpoints
    ///
    /// # Arguments
    /// * `token` - OAuth2 access token (e.g. from `gcloud auth print-access-token`)
    pub fn new(token: String) -> Result<Self, GcpError> {
        Self::with_endpoints(token, Endpoints::default())
    }

    /// Create a client against custom endpoints (emulators, proxies)
    pub fn with_endpoints(token: String, endpoints: Endpoints) -> Result<Self, GcpError> {
        if token.trim().is_empty() {
            return Err(GcpError::Authentication("access token is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GcpError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, token),
            endpoints,
        })
    }

    /// Endpoint table in use
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn compute_global(&self, project: &str, collection: &str) -> String {
        format!("{}/projects/{}/global/{}", self.endpoints.compute, project, collection)
    }

    fn compute_region(&self, project: &str, region: &str, collection: &str) -> String {
        format!(
            "{}/projects/{}/regions/{}/{}",
            self.endpoints.compute, project, region, collection
        )
    }

    fn kms(&self, resource: &str) -> String {
        format!("{}/{}", self.endpoints.kms, resource)
    }

    fn container(&self, resource: &str) -> String {
        format!("{}/{}", self.endpoints.container, resource)
    }
}

#[async_trait::async_trait]
impl ComputeOperationsClientTrait for GcpClient {
    async fn get_global_operation(&self, project: &str, operation: &str) -> Result<ComputeOperation, GcpError> {
        let url = format!("{}/{}", self.compute_global(project, "operations"), operation);
        self.http.get(&url).await
    }

    async fn get_region_operation(
        &self,
        project: &str,
        region: &str,
        operation: &str,
    ) -> Result<ComputeOperation, GcpError> {
        let url = format!("{}/{}", self.compute_region(project, region, "operations"), operation);
        self.http.get(&url).await
    }
}

#[async_trait::async_trait]
impl NetworksClientTrait for GcpClient {
    async fn get_network(&self, project: &str, name: &str) -> Result<Network, GcpError> {
        let url = format!("{}/{}", self.compute_global(project, "networks"), name);
        self.http.get(&url).await
    }

    async fn insert_network(&self, project: &str, network: &Network) -> Result<ComputeOperation, GcpError> {
        let url = self.compute_global(project, "networks");
        self.http.post(&url, &serde_json::to_value(network)?).await
    }

    async fn delete_network(&self, project: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        let url = format!("{}/{}", self.compute_global(project, "networks"), name);
        self.http.delete(&url).await
    }
}

#[async_trait::async_trait]
impl SubnetworksClientTrait for GcpClient {
    async fn get_subnetwork(&self, project: &str, region: &str, name: &str) -> Result<Subnetwork, GcpError> {
        let url = format!("{}/{}", self.compute_region(project, region, "subnetworks"), name);
        self.http.get(&url).await
    }

    async fn insert_subnetwork(
        &self,
        project: &str,
        region: &str,
        subnetwork: &Subnetwork,
    ) -> Result<ComputeOperation, GcpError> {
        let url = self.compute_region(project, region, "subnetworks");
        self.http.post(&url, &serde_json::to_value(subnetwork)?).await
    }

    async fn delete_subnetwork(&self, project: &str, region: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        let url = format!("{}/{}", self.compute_region(project, region, "subnetworks"), name);
        self.http.delete(&url).await
    }
}

#[async_trait::async_trait]
impl RoutersClientTrait for GcpClient {
    async fn get_router(&self, project: &str, region: &str, name: &str) -> Result<Router, GcpError> {
        let url = format!("{}/{}", self.compute_region(project, region, "routers"), name);
        self.http.get(&url).await
    }

    async fn insert_router(&self, project: &str, region: &str, router: &Router) -> Result<ComputeOperation, GcpError> {
        let url = self.compute_region(project, region, "routers");
        self.http.post(&url, &serde_json::to_value(router)?).await
    }

    async fn delete_router(&self, project: &str, region: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        let url = format!("{}/{}", self.compute_region(project, region, "routers"), name);
        self.http.delete(&url).await
    }
}

#[async_trait::async_trait]
impl FirewallsClientTrait for GcpClient {
    async fn get_firewall(&self, project: &str, name: &str) -> Result<Firewall, GcpError> {
        let url = format!("{}/{}", self.compute_global(project, "firewalls"), name);
        self.http.get(&url).await
    }

    async fn insert_firewall(&self, project: &str, firewall: &Firewall) -> Result<ComputeOperation, GcpError> {
        let url = self.compute_global(project, "firewalls");
        self.http.post(&url, &serde_json::to_value(firewall)?).await
    }

    async fn delete_firewall(&self, project: &str, name: &str) -> Result<ComputeOperation, GcpError> {
        let url = format!("{}/{}", self.compute_global(project, "firewalls"), name);
        self.http.delete(&url).await
    }
}

#[async_trait::async_trait]
impl KmsClientTrait for GcpClient {
    async fn get_key_ring(&self, name: &str) -> Result<KeyRing, GcpError> {
        self.http.get(&self.kms(name)).await
    }

    async fn create_key_ring(&self, parent: &str, key_ring_id: &str) -> Result<KeyRing, GcpError> {
        let query = HttpClient::build_query_string(&[("keyRingId", key_ring_id)]);
        let url = format!("{}/keyRings?{}", self.kms(parent), query);
        self.http.post(&url, &json!({})).await
    }

    async fn get_crypto_key(&self, name: &str) -> Result<CryptoKey, GcpError> {
        self.http.get(&self.kms(name)).await
    }

    async fn create_crypto_key(
        &self,
        parent: &str,
        crypto_key_id: &str,
        key: &CryptoKey,
    ) -> Result<CryptoKey, GcpError> {
        let query = HttpClient::build_query_string(&[("cryptoKeyId", crypto_key_id)]);
        let url = format!("{}/cryptoKeys?{}", self.kms(parent), query);
        // Output-only fields must not be sent on create
        let body = json!({ "purpose": key.purpose });
        self.http.post(&url, &body).await
    }

    async fn get_crypto_key_version(&self, name: &str) -> Result<CryptoKeyVersion, GcpError> {
        self.http.get(&self.kms(name)).await
    }

    async fn update_crypto_key_version(
        &self,
        name: &str,
        state: CryptoKeyVersionState,
    ) -> Result<CryptoKeyVersion, GcpError> {
        let query = HttpClient::build_query_string(&[("updateMask", "state")]);
        let url = format!("{}?{}", self.kms(name), query);
        self.http.patch(&url, &json!({ "state": state })).await
    }

    async fn create_crypto_key_version(&self, parent: &str) -> Result<CryptoKeyVersion, GcpError> {
        let url = format!("{}/cryptoKeyVersions", self.kms(parent));
        self.http.post(&url, &json!({})).await
    }

    async fn update_crypto_key_primary_version(
        &self,
        name: &str,
        version_id: &str,
    ) -> Result<CryptoKey, GcpError> {
        let url = format!("{}:updatePrimaryVersion", self.kms(name));
        self.http
            .post(&url, &json!({ "cryptoKeyVersionId": version_id }))
            .await
    }

    async fn restore_crypto_key_version(&self, name: &str) -> Result<CryptoKeyVersion, GcpError> {
        let url = format!("{}:restore", self.kms(name));
        self.http.post(&url, &json!({})).await
    }

    async fn get_iam_policy(&self, resource: &str) -> Result<Policy, GcpError> {
        // Conditional bindings are only returned intact at version 3
        let version = IAM_POLICY_VERSION.to_string();
        let query = HttpClient::build_query_string(&[("options.requestedPolicyVersion", version.as_str())]);
        let url = format!("{}:getIamPolicy?{}", self.kms(resource), query);
        self.http.get(&url).await
    }

    async fn set_iam_policy(&self, resource: &str, policy: &Policy) -> Result<Policy, GcpError> {
        let url = format!("{}:setIamPolicy", self.kms(resource));
        debug!("Setting IAM policy on {} ({} bindings)", resource, policy.bindings.len());
        self.http.post(&url, &json!({ "policy": policy })).await
    }
}

#[async_trait::async_trait]
impl ClusterManagerClientTrait for GcpClient {
    async fn get_cluster(&self, name: &str) -> Result<Cluster, GcpError> {
        self.http.get(&self.container(name)).await
    }

    async fn create_cluster(&self, parent: &str, cluster: &Cluster) -> Result<ContainerOperation, GcpError> {
        let url = format!("{}/clusters", self.container(parent));
        self.http.post(&url, &json!({ "cluster": cluster })).await
    }

    async fn update_cluster(&self, name: &str, update: &ClusterUpdate) -> Result<ContainerOperation, GcpError> {
        self.http
            .put(&self.container(name), &json!({ "update": update }))
            .await
    }

    async fn update_node_pool(&self, request: &UpdateNodePoolRequest) -> Result<ContainerOperation, GcpError> {
        self.http
            .put(&self.container(&request.name), &serde_json::to_value(request)?)
            .await
    }

    async fn delete_cluster(&self, name: &str) -> Result<ContainerOperation, GcpError> {
        self.http.delete(&self.container(name)).await
    }

    async fn get_operation(&self, name: &str) -> Result<ContainerOperation, GcpError> {
        self.http.get(&self.container(name)).await
    }
}

#[async_trait::async_trait]
impl ProjectsClientTrait for GcpClient {
    async fn get_project(&self, project_id: &str) -> Result<Project, GcpError> {
        let url = format!("{}/projects/{}", self.endpoints.resource_manager, project_id);
        self.http.get(&url).await
    }
}

#[async_trait::async_trait]
impl ServiceUsageClientTrait for GcpClient {
    async fn batch_enable_services(
        &self,
        parent: &str,
        services: &[String],
    ) -> Result<LongRunningOperation, GcpError> {
        if services.is_empty() {
            return Err(GcpError::InvalidRequest("no services to enable".to_string()));
        }
        let url = format!("{}/{}/services:batchEnable", self.endpoints.service_usage, parent);
        self.http.post(&url, &json!({ "serviceIds": services })).await
    }

    async fn get_service_operation(&self, name: &str) -> Result<LongRunningOperation, GcpError> {
        let url = format!("{}/{}", self.endpoints.service_usage, name);
        self.http.get(&url).await
    }
}
