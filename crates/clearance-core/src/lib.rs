//! # Clearance Kernel Core
//!
//! Pure primitives for the Clearance Kernel: identities, classification
//! policy, and the privacy-preserving document index.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over identifiers, keys, and policy inputs.
//!
//! ## Key Types
//!
//! - [`DualKeyIdentity`] - Signing + encryption keys derived from one seed
//! - [`Fingerprint`] - SHA-256 of a public key, used for credential binding
//! - [`ClassificationLevel`] - The fixed four-level clearance order
//! - [`ClassificationPolicy`] - Clearance and releasability evaluation
//! - [`PrivacyIndex`] - Bloom filter over registered documents and tags
//! - [`DocumentRegistry`] - Immutable document records plus their index
//!
//! ## Canonicalization
//!
//! Everything that gets signed is encoded with deterministic CBOR.
//! See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod document;
pub mod error;
pub mod identity;
pub mod index;
pub mod policy;
pub mod types;

pub use canonical::{encode_canonical, CanonicalMap};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Fingerprint, X25519PublicKey};
pub use document::{DocumentRecord, DocumentRegistry};
pub use error::{AuthorizationError, CoreError};
pub use identity::{DualKeyIdentity, KeyPurpose, PublicIdentity};
pub use index::{IndexConfig, PrivacyIndex};
pub use policy::{ClassificationPolicy, Requester};
pub use types::{ClassificationLevel, Did, DocumentId, EphemeralId, Organization};

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
