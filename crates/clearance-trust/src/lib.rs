//! # Clearance Kernel Trust
//!
//! Everything that decides whether key material may be used.
//!
//! ## Overview
//!
//! - [`TrustVerifier`] checks that a credential was issued by the pinned
//!   authority with the expected schema, and that local keys are bound to
//!   it by fingerprint.
//! - [`MessageCodec`] is the authenticated box shared by access responses,
//!   the sealed document cache and wallet-to-wallet messages.
//! - [`EphemeralKeyPair`] is a single-use key that destroys itself after
//!   one decryption.
//!
//! ## Encryption Model
//!
//! 1. X25519 between sender and recipient keys
//! 2. BLAKE3 key derivation over the shared secret and both public keys
//! 3. XChaCha20-Poly1305 with a random 24-byte nonce

pub mod codec;
pub mod credential;
pub mod envelope;
pub mod ephemeral;
pub mod error;
pub mod verifier;

pub use codec::{BoxNonce, MessageCodec, NONCE_LEN};
pub use credential::{ClearanceCredential, CredentialKeys, CLEARANCE_CREDENTIAL_SCHEMA};
pub use envelope::SealedMessage;
pub use ephemeral::EphemeralKeyPair;
pub use error::{
    BindingError, CryptoError, EphemeralError, ReplayOrReuseError, Result, TrustError,
};
pub use verifier::{TrustAnchor, TrustVerifier, VerifiedClearance};
