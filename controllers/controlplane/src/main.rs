//! tidalwave
//!
//! One-shot provisioner for a private GKE controlplane on Google Cloud:
//! - Network, Subnetwork (pods/services ranges), Router with Cloud NAT
//! - KMS key ring and crypto key for secrets encryption, with the GKE
//!   service agent granted encrypt/decrypt
//! - GKE cluster with an autoscaled default pool
//! - Firewalls for intra-cluster egress and admission webhooks
//!
//! The desired state is read from a `Controlplane` manifest.

mod backoff;
mod config;
mod controller;
mod error;
mod key_version;
mod poller;
mod project;
mod reconcile_helpers;
mod reconciler;
#[cfg(test)]
mod test_utils;

use crate::config::ControlplaneConfig;
use crate::controller::ControlplaneController;
use crate::error::ControllerError;
use crate::key_version::KeyVersionSettings;
use crate::poller::{OperationPoller, PollSettings};
use clap::{Parser, Subcommand};
use gcp_client::{Endpoints, GcpClient, GcpClients};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tidalwave", version, about = "Provision a private GKE controlplane")]
struct Cli {
    /// Controlplane manifest
    #[arg(short, long, env = "TIDALWAVE_CONFIG", default_value = "tidalwave.yaml")]
    file: PathBuf,

    /// Give up (and cancel in-flight waits) after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Enable APIs and create every missing resource
    Create,
    /// Re-apply the key grant and cluster configuration to existing resources
    Update,
    /// Tear down everything except the key ring and key material
    Delete,
    /// Only enable the required APIs
    EnableApis,
}

/// Endpoints, with `GCP_*_ENDPOINT` overrides
fn endpoints_from_env() -> Endpoints {
    let defaults = Endpoints::default();
    let pick = |var: &str, default: String| env::var(var).unwrap_or(default);
    Endpoints {
        compute: pick("GCP_COMPUTE_ENDPOINT", defaults.compute),
        kms: pick("GCP_KMS_ENDPOINT", defaults.kms),
        container: pick("GCP_CONTAINER_ENDPOINT", defaults.container),
        resource_manager: pick("GCP_RESOURCE_MANAGER_ENDPOINT", defaults.resource_manager),
        service_usage: pick("GCP_SERVICE_USAGE_ENDPOINT", defaults.service_usage),
    }
}

async fn run(cli: &Cli, controller: &ControlplaneController) -> Result<(), ControllerError> {
    let mut manifest = config::load_manifest(&cli.file)?;
    config::validate_manifest(&manifest)?;
    let project_id = manifest.spec.project_id.clone();

    if let Command::EnableApis = cli.command {
        return controller.enable_apis(&project_id).await;
    }
    if matches!(cli.command, Command::Create | Command::Update) {
        controller.enable_apis(&project_id).await?;
    }

    let project_number = controller.project_number(&project_id).await?;
    let config = ControlplaneConfig::from_manifest(&manifest, &project_number)?;

    let provisioned = match cli.command {
        Command::Create => controller.create(&config).await?,
        Command::Update => controller.update(&config).await?,
        Command::Delete => return controller.delete(&config).await,
        Command::EnableApis => return Ok(()),
    };

    manifest.status = Some(provisioned.status());
    println!("{}", config::render_manifest(&manifest)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let token = env::var("GCP_ACCESS_TOKEN").map_err(|_| {
        ControllerError::InvalidConfig(
            "GCP_ACCESS_TOKEN environment variable is required (e.g. $(gcloud auth print-access-token))".to_string(),
        )
    })?;
    let endpoints = endpoints_from_env();

    info!("Configuration:");
    info!("  Manifest: {}", cli.file.display());
    info!("  Command: {:?}", cli.command);
    info!("  Compute endpoint: {}", endpoints.compute);
    info!(
        "  Timeout: {}",
        cli.timeout.map_or_else(|| "none".to_string(), |secs| format!("{}s", secs))
    );

    let client = GcpClient::with_endpoints(token, endpoints)?;
    let cancel = CancellationToken::new();
    let controller = ControlplaneController::new(
        GcpClients::from_client(client),
        OperationPoller::new(PollSettings::default(), cancel.clone()),
        KeyVersionSettings::default(),
    );

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling; provider operations already started keep running");
            interrupt.cancel();
        }
    });

    match cli.timeout {
        Some(secs) => {
            let limit = Duration::from_secs(secs);
            match tokio::time::timeout(limit, run(&cli, &controller)).await {
                Ok(result) => result,
                Err(_) => {
                    cancel.cancel();
                    Err(ControllerError::Timeout {
                        operation: format!("{:?}", cli.command).to_lowercase(),
                        waited: limit,
                    })
                }
            }
        }
        None => run(&cli, &controller).await,
    }
}
