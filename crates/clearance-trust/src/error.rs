//! Error types for credential trust and key handling.

use thiserror::Error;

use clearance_core::{Did, EphemeralId, Fingerprint, KeyPurpose};

/// The credential is not trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    #[error("schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("untrusted issuer: expected {expected}, got {actual}")]
    UntrustedIssuer { expected: Did, actual: Did },

    #[error("credential is missing the {0} claim")]
    MissingClaim(&'static str),

    #[error("credential expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },

    #[error("invalid issuer proof: {0}")]
    InvalidProof(String),

    #[error("malformed credential: {0}")]
    Malformed(String),
}

/// A local key is not bound to the credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("{purpose:?} key fingerprint {local} does not match credential fingerprint {declared}")]
    FingerprintMismatch {
        purpose: KeyPurpose,
        declared: Fingerprint,
        local: Fingerprint,
    },
}

/// Authenticated encryption failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication tag mismatch or wrong key.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Single-use material used twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayOrReuseError {
    #[error("ephemeral key {0} already destroyed")]
    KeyDestroyed(EphemeralId),

    #[error("nonce already seen: {0}")]
    NonceReplayed(String),
}

/// Failures of an ephemeral decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EphemeralError {
    #[error(transparent)]
    Reuse(#[from] ReplayOrReuseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result type for trust checks.
pub type Result<T, E = TrustError> = std::result::Result<T, E>;
