//! Controlplane CRD
//!
//! Declarative description of a controlplane: one network, subnetwork,
//! router/NAT, key hierarchy, GKE cluster and its firewalls.
//! The manifest is read from a file and applied one-shot; it follows the
//! Kubernetes object layout so it can also be stored in a cluster.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "tidalwave.io",
    version = "v1alpha1",
    kind = "Controlplane",
    status = "ControlplaneStatus",
    shortname = "cp"
)]
#[serde(rename_all = "camelCase")]
pub struct ControlplaneSpec {
    /// Cloud provider; only Google is supported
    #[serde(default)]
    pub provider: Provider,

    /// Google Cloud project id
    #[serde(default, alias = "projectID")]
    pub project_id: String,

    /// Region for the subnetwork, router, key ring and cluster
    #[serde(default = "default_region")]
    pub region: String,

    /// Address ranges for nodes, pods and services
    #[serde(default)]
    pub cidrs: Cidrs,

    /// Cluster sizing and control plane access
    #[serde(default)]
    pub cluster: ClusterSettings,
}

impl Default for ControlplaneSpec {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            project_id: String::new(),
            region: default_region(),
            cidrs: Cidrs::default(),
            cluster: ClusterSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Cloud
    #[default]
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cidrs {
    /// Primary range of the subnetwork
    #[serde(default = "default_nodes_cidr")]
    pub nodes: String,
    /// Secondary range `pods`
    #[serde(default = "default_pods_cidr")]
    pub pods: String,
    /// Secondary range `services`
    #[serde(default = "default_services_cidr")]
    pub services: String,
}

impl Default for Cidrs {
    fn default() -> Self {
        Self {
            nodes: default_nodes_cidr(),
            pods: default_pods_cidr(),
            services: default_services_cidr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSettings {
    #[serde(default = "default_machine_type")]
    pub machine_type: String,

    /// Node boot disk size in GB
    #[serde(default = "default_disk_size")]
    pub disk_size: i32,

    #[serde(default = "default_min_node_count")]
    pub min_node_count: i32,

    #[serde(default = "default_max_node_count")]
    pub max_node_count: i32,

    /// Networks allowed to reach the Kubernetes API
    #[serde(default = "default_master_auth_block")]
    pub master_auth_block: Vec<MasterAuthBlock>,

    /// /28 reserved for the private control plane endpoint
    #[serde(default = "default_master_cidr_block")]
    pub master_cidr_block: String,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            machine_type: default_machine_type(),
            disk_size: default_disk_size(),
            min_node_count: default_min_node_count(),
            max_node_count: default_max_node_count(),
            master_auth_block: default_master_auth_block(),
            master_cidr_block: default_master_cidr_block(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MasterAuthBlock {
    #[serde(default)]
    pub display_name: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum ControlplanePhase {
    #[default]
    Pending,
    Ready,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlplaneStatus {
    #[serde(default)]
    pub phase: ControlplanePhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_self_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork_self_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_self_link: Option<String>,

    /// Full KMS key ring name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ring: Option<String>,

    /// Full KMS crypto key name used for secrets encryption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_key: Option<String>,

    /// Primary key version and its observed state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_self_link: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub firewall_self_links: Vec<String>,

    /// GKE service agent granted encrypt/decrypt on the crypto key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_region() -> String {
    "us-central1".to_string()
}

fn default_nodes_cidr() -> String {
    "10.0.0.0/24".to_string()
}

fn default_pods_cidr() -> String {
    "10.1.0.0/16".to_string()
}

fn default_services_cidr() -> String {
    "10.2.0.0/20".to_string()
}

fn default_machine_type() -> String {
    "n2-standard-4".to_string()
}

fn default_disk_size() -> i32 {
    100
}

fn default_min_node_count() -> i32 {
    1
}

fn default_max_node_count() -> i32 {
    3
}

fn default_master_auth_block() -> Vec<MasterAuthBlock> {
    vec![MasterAuthBlock {
        display_name: "public".to_string(),
        cidr_block: "0.0.0.0/0".to_string(),
    }]
}

fn default_master_cidr_block() -> String {
    "172.16.0.0/28".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_minimal_manifest_gets_defaults() {
        let manifest = r#"
apiVersion: tidalwave.io/v1alpha1
kind: Controlplane
metadata:
  name: demo
spec:
  projectID: demo-project
"#;
        let cp: Controlplane = serde_yaml::from_str(manifest).unwrap();
        assert_eq!(cp.metadata.name.as_deref(), Some("demo"));
        assert_eq!(cp.spec.project_id, "demo-project");
        assert_eq!(cp.spec.provider, Provider::Google);
        assert_eq!(cp.spec.region, "us-central1");
        assert_eq!(cp.spec.cidrs, Cidrs::default());
        assert_eq!(cp.spec.cluster.machine_type, "n2-standard-4");
        assert_eq!(cp.spec.cluster.disk_size, 100);
        assert_eq!(cp.spec.cluster.master_auth_block.len(), 1);
        assert_eq!(cp.spec.cluster.master_auth_block[0].cidr_block, "0.0.0.0/0");
        assert!(cp.status.is_none());
    }

    #[test]
    fn test_partial_cluster_settings_keep_other_defaults() {
        let manifest = r#"
apiVersion: tidalwave.io/v1alpha1
kind: Controlplane
metadata:
  name: demo
spec:
  projectId: demo-project
  cidrs:
    pods: 10.8.0.0/14
  cluster:
    maxNodeCount: 10
    masterAuthBlock:
      - displayName: office
        cidrBlock: 203.0.113.0/24
"#;
        let cp: Controlplane = serde_yaml::from_str(manifest).unwrap();
        assert_eq!(cp.spec.cidrs.pods, "10.8.0.0/14");
        assert_eq!(cp.spec.cidrs.nodes, "10.0.0.0/24");
        assert_eq!(cp.spec.cluster.max_node_count, 10);
        assert_eq!(cp.spec.cluster.min_node_count, 1);
        assert_eq!(cp.spec.cluster.master_auth_block[0].display_name, "office");
        assert_eq!(cp.spec.cluster.master_cidr_block, "172.16.0.0/28");
    }

    #[test]
    fn test_crd_metadata() {
        let crd = Controlplane::crd();
        assert_eq!(crd.spec.group, "tidalwave.io");
        assert_eq!(crd.spec.names.kind, "Controlplane");
        assert_eq!(crd.spec.scope, "Cluster");
    }
}
