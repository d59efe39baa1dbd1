//! Print the Controlplane CRD as YAML
//!
//! `cargo run -p crds --bin crdgen > controlplane-crd.yaml`

use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&crds::Controlplane::crd())?);
    Ok(())
}
