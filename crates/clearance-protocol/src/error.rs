//! Error types for the access protocol.

use std::time::Duration;

use thiserror::Error;

use clearance_trust::{BindingError, CryptoError, EphemeralError, TrustError};

use crate::messages::{AccessRejection, RejectionCode};
use crate::protocol::AccessState;

/// Errors that end an access attempt.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The authority did not answer in time.
    #[error("no response from authority within {0:?}")]
    Timeout(Duration),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be decoded or failed its limits.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The authority refused the request.
    #[error("authority rejected request ({code:?}): {message}")]
    Rejected { code: RejectionCode, message: String },

    /// An operation was called in the wrong state.
    #[error("invalid state: expected {expected:?}, attempt is {actual:?}")]
    InvalidState {
        expected: AccessState,
        actual: AccessState,
    },

    #[error("credential not trusted: {0}")]
    Trust(#[from] TrustError),

    #[error("key binding failed: {0}")]
    Binding(#[from] BindingError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("ephemeral key error: {0}")]
    Ephemeral(#[from] EphemeralError),
}

impl From<AccessRejection> for ProtocolError {
    fn from(rejection: AccessRejection) -> Self {
        Self::Rejected {
            code: rejection.code,
            message: rejection.message,
        }
    }
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
