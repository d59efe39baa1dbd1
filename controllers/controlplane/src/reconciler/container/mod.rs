//! Kubernetes Engine primitives

pub mod cluster;
#[cfg(test)]
mod cluster_test;

pub use cluster::ClusterResource;
