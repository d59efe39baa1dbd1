//! Compute Engine reconcilers
//!
//! Handles: Network, Subnetwork, Router (Cloud NAT), Firewall.
//! These are structural resources: created once, never reshaped by update.

pub mod firewall;
#[cfg(test)]
mod firewall_test;
pub mod network;
pub mod router;
pub mod subnetwork;
#[cfg(test)]
mod subnetwork_test;

pub use firewall::FirewallResource;
pub use network::NetworkResource;
pub use router::RouterResource;
pub use subnetwork::SubnetworkResource;
