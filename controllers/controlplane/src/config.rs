//! Configuration boundary
//!
//! Reads the `Controlplane` manifest, validates it, and expands it into the
//! typed per-resource specs the orchestrator consumes. Defaults come from the
//! serde defaults on the manifest types; nothing here is global.

use crate::error::ControllerError;
use crds::Controlplane;
use gcp_client::{CidrBlock, CryptoKeyPurpose, FirewallDirection, FirewallRule};
use kube::ResourceExt;
use std::path::Path;

/// Suffix appended to the per-controlplane resources (and stripped from manifest names)
pub const CONTROLPLANE_SUFFIX: &str = "-controlplane";
/// Node pool created with the cluster; also used as its network tag
pub const DEFAULT_NODE_POOL: &str = "default-pool";
/// Secondary range of the subnetwork used for pods
pub const PODS_RANGE_NAME: &str = "pods";
/// Secondary range of the subnetwork used for services
pub const SERVICES_RANGE_NAME: &str = "services";

/// Network: custom mode VPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub project: String,
    pub name: String,
}

/// Subnetwork with the pod and service secondary ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetworkSpec {
    pub project: String,
    pub region: String,
    pub name: String,
    pub nodes_cidr: String,
    pub pods_cidr: String,
    pub services_cidr: String,
}

/// Cloud Router carrying a NAT for the private nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSpec {
    pub project: String,
    pub region: String,
    pub name: String,
    pub nat_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRingSpec {
    pub project: String,
    pub location: String,
    pub name: String,
}

impl KeyRingSpec {
    /// `projects/{project}/locations/{location}`
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }

    /// `projects/{project}/locations/{location}/keyRings/{name}`
    pub fn full_name(&self) -> String {
        format!("{}/keyRings/{}", self.parent(), self.name)
    }
}

/// Crypto key used for application-layer secrets encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoKeySpec {
    pub name: String,
    pub purpose: CryptoKeyPurpose,
    /// IAM member granted encrypt/decrypt on the key
    pub service_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSpec {
    pub project: String,
    pub region: String,
    pub name: String,
    pub machine_type: String,
    pub disk_size_gb: i32,
    pub min_node_count: i32,
    pub max_node_count: i32,
    pub master_authorized_networks: Vec<CidrBlock>,
    pub master_cidr_block: String,
}

impl ClusterSpec {
    /// `projects/{project}/locations/{region}`
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.region)
    }

    /// `projects/{project}/locations/{region}/clusters/{name}`
    pub fn full_name(&self) -> String {
        format!("{}/clusters/{}", self.parent(), self.name)
    }

    pub fn workload_pool(&self) -> String {
        format!("{}.svc.id.goog", self.project)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirewallSpec {
    pub project: String,
    pub name: String,
    pub direction: FirewallDirection,
    pub allowed: Vec<FirewallRule>,
    pub source_ranges: Vec<String>,
    pub destination_ranges: Vec<String>,
    pub target_tags: Vec<String>,
}

/// The whole provisioning graph, fully populated
#[derive(Debug, Clone, PartialEq)]
pub struct ControlplaneConfig {
    /// Base name (manifest name without the `-controlplane` suffix)
    pub name: String,
    pub project_id: String,
    pub project_number: String,
    pub region: String,
    pub network: NetworkSpec,
    pub subnetwork: SubnetworkSpec,
    pub router: RouterSpec,
    pub key_ring: KeyRingSpec,
    pub crypto_key: CryptoKeySpec,
    pub cluster: ClusterSpec,
    pub firewalls: Vec<FirewallSpec>,
}

impl ControlplaneConfig {
    /// Expand a validated manifest into per-resource specs
    pub fn from_manifest(manifest: &Controlplane, project_number: &str) -> Result<Self, ControllerError> {
        validate_manifest(manifest)?;
        if project_number.trim().is_empty() {
            return Err(ControllerError::PreconditionFailed("project number must not be empty".to_string()));
        }

        let spec = &manifest.spec;
        let full_name = manifest.name_any();
        let name = base_name(&full_name).to_string();
        let controlplane_name = format!("{}{}", name, CONTROLPLANE_SUFFIX);
        let project = spec.project_id.clone();
        let region = spec.region.clone();
        let master_cidr = spec.cluster.master_cidr_block.clone();

        let firewalls = vec![
            FirewallSpec {
                project: project.clone(),
                name: format!("{}-intra-cluster-egress", name),
                direction: FirewallDirection::Egress,
                allowed: ["tcp", "udp", "icmp", "sctp", "esp", "ah"]
                    .into_iter()
                    .map(|protocol| FirewallRule {
                        ip_protocol: protocol.to_string(),
                        ports: Vec::new(),
                    })
                    .collect(),
                source_ranges: Vec::new(),
                destination_ranges: vec![master_cidr.clone(), spec.cidrs.nodes.clone(), spec.cidrs.pods.clone()],
                target_tags: vec![DEFAULT_NODE_POOL.to_string()],
            },
            FirewallSpec {
                project: project.clone(),
                name: format!("{}-webhooks", name),
                direction: FirewallDirection::Ingress,
                allowed: vec![FirewallRule {
                    ip_protocol: "tcp".to_string(),
                    ports: vec!["8443".to_string(), "9443".to_string(), "15017".to_string()],
                }],
                source_ranges: vec![master_cidr.clone()],
                destination_ranges: Vec::new(),
                target_tags: vec![DEFAULT_NODE_POOL.to_string()],
            },
        ];

        Ok(Self {
            network: NetworkSpec {
                project: project.clone(),
                name: name.clone(),
            },
            subnetwork: SubnetworkSpec {
                project: project.clone(),
                region: region.clone(),
                name: controlplane_name.clone(),
                nodes_cidr: spec.cidrs.nodes.clone(),
                pods_cidr: spec.cidrs.pods.clone(),
                services_cidr: spec.cidrs.services.clone(),
            },
            router: RouterSpec {
                project: project.clone(),
                region: region.clone(),
                name: name.clone(),
                nat_name: name.clone(),
            },
            key_ring: KeyRingSpec {
                project: project.clone(),
                location: region.clone(),
                name: controlplane_name.clone(),
            },
            crypto_key: CryptoKeySpec {
                name: controlplane_name.clone(),
                purpose: CryptoKeyPurpose::EncryptDecrypt,
                service_agent: service_agent(project_number),
            },
            cluster: ClusterSpec {
                project: project.clone(),
                region: region.clone(),
                name: controlplane_name,
                machine_type: spec.cluster.machine_type.clone(),
                disk_size_gb: spec.cluster.disk_size,
                min_node_count: spec.cluster.min_node_count,
                max_node_count: spec.cluster.max_node_count,
                master_authorized_networks: spec
                    .cluster
                    .master_auth_block
                    .iter()
                    .map(|block| CidrBlock {
                        display_name: block.display_name.clone(),
                        cidr_block: block.cidr_block.clone(),
                    })
                    .collect(),
                master_cidr_block: master_cidr,
            },
            firewalls,
            name,
            project_id: project,
            project_number: project_number.to_string(),
            region,
        })
    }
}

/// Read and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Controlplane, ControllerError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ControllerError::Manifest(format!("failed to read {}: {}", path.display(), e)))?;
    parse_manifest(&contents)
}

pub fn parse_manifest(yaml: &str) -> Result<Controlplane, ControllerError> {
    serde_yaml::from_str(yaml).map_err(|e| ControllerError::Manifest(format!("invalid manifest: {}", e)))
}

/// Render a manifest (including status) back to YAML
pub fn render_manifest(manifest: &Controlplane) -> Result<String, ControllerError> {
    serde_yaml::to_string(manifest).map_err(|e| ControllerError::Manifest(format!("failed to render manifest: {}", e)))
}

/// Strip a trailing `-controlplane` from a manifest name
pub fn base_name(name: &str) -> &str {
    name.strip_suffix(CONTROLPLANE_SUFFIX).unwrap_or(name)
}

/// GKE service agent of a project, as an IAM member
pub fn service_agent(project_number: &str) -> String {
    format!(
        "serviceAccount:service-{}@container-engine-robot.iam.gserviceaccount.com",
        project_number
    )
}

/// Check required fields and bounds before any provider call
pub fn validate_manifest(manifest: &Controlplane) -> Result<(), ControllerError> {
    let name = manifest.name_any();
    if base_name(&name).trim().is_empty() {
        return Err(ControllerError::PreconditionFailed("metadata.name must not be empty".to_string()));
    }

    let spec = &manifest.spec;
    if spec.project_id.trim().is_empty() {
        return Err(ControllerError::PreconditionFailed("spec.projectID must not be empty".to_string()));
    }
    if spec.region.trim().is_empty() {
        return Err(ControllerError::PreconditionFailed("spec.region must not be empty".to_string()));
    }

    for (field, value) in [
        ("spec.cidrs.nodes", &spec.cidrs.nodes),
        ("spec.cidrs.pods", &spec.cidrs.pods),
        ("spec.cidrs.services", &spec.cidrs.services),
        ("spec.cluster.masterCidrBlock", &spec.cluster.master_cidr_block),
    ] {
        if value.trim().is_empty() {
            return Err(ControllerError::PreconditionFailed(format!("{} must not be empty", field)));
        }
    }

    let cluster = &spec.cluster;
    if cluster.min_node_count < 0 || cluster.min_node_count > cluster.max_node_count {
        return Err(ControllerError::InvalidConfig(format!(
            "node count bounds are invalid: min {} max {}",
            cluster.min_node_count, cluster.max_node_count
        )));
    }
    if cluster.disk_size <= 0 {
        return Err(ControllerError::InvalidConfig(format!(
            "spec.cluster.diskSize must be positive, got {}",
            cluster.disk_size
        )));
    }
    if cluster.master_auth_block.iter().any(|block| block.cidr_block.trim().is_empty()) {
        return Err(ControllerError::PreconditionFailed(
            "spec.cluster.masterAuthBlock entries need a cidrBlock".to_string(),
        ));
    }
    Ok(())
}
