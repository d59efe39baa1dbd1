//! Google Cloud REST Client
//!
//! Capability clients for the Google Cloud APIs used to provision a tidalwave
//! controlplane: Compute Engine networking, Cloud KMS, Kubernetes Engine,
//! Resource Manager and Service Usage.
//!
//! # Example
//!
//! ```no_run
//! use gcp_client::{GcpClient, NetworksClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client from an OAuth2 access token
//! let client = GcpClient::new(std::env::var("GCP_ACCESS_TOKEN")?)?;
//!
//! // Look up a VPC network
//! let network = client.get_network("my-project", "demo").await?;
//! println!("{}", network.self_link.unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **One trait per capability**: reconcilers depend only on what they use
//! - **Typed errors**: 404 surfaces as `GcpError::NotFound` for idempotent branching
//! - **Operations**: compute, GKE and long-running operation models for polling
//! - **Mocking**: `MockGcpClient` behind the `test-util` feature

pub mod client;
pub mod clients;
pub mod common;
pub mod error;
#[path = "trait.rs"]
pub mod gcp_trait;
pub mod models;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::GcpClient;
pub use clients::GcpClients;
pub use common::{Endpoints, HttpClient};
pub use error::GcpError;
pub use gcp_trait::*;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockGcpClient;
