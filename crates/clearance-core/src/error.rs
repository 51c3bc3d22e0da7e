//! Error types for the Clearance Kernel Core.

use thiserror::Error;

use crate::types::{ClassificationLevel, DocumentId, Organization};

/// Core errors for decoding and constructing primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid classification level: {0}")]
    InvalidLevel(u8),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("document already registered: {0}")]
    DocumentExists(DocumentId),

    #[error("invalid index parameters: {0}")]
    InvalidIndexParameters(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Denial reasons from the classification policy.
///
/// Clearance is checked before releasability, so a requester failing both
/// is reported as lacking clearance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("insufficient clearance: document requires {required}, requester holds {held}")]
    InsufficientClearance {
        required: ClassificationLevel,
        held: String,
    },

    #[error("document is not releasable to organization {organization}")]
    NotReleasable { organization: Organization },

    #[error("unknown document: {0}")]
    UnknownDocument(DocumentId),
}
