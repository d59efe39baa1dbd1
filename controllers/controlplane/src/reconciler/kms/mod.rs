//! Cloud KMS primitives
//!
//! Key rings are permanent at the provider, so the key ring primitive never
//! deletes anything. The crypto key primitive owns the primary version state
//! and the service agent's IAM grant.

pub mod crypto_key;
pub mod key_ring;

pub use crypto_key::CryptoKeyResource;
pub use key_ring::KeyRingResource;
