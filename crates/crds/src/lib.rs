//! tidalwave CRD Definitions
//!
//! The `Controlplane` manifest consumed by the tidalwave provisioner.

pub mod controlplane;

pub use controlplane::*;
