//! Error types for the Kernel.

use std::time::Duration;

use thiserror::Error;

use clearance_core::{AuthorizationError, CoreError};
use clearance_protocol::{ProtocolError, RejectionCode};
use clearance_store::{ExpiryError, StoreError};
use clearance_trust::{BindingError, CryptoError, EphemeralError, ReplayOrReuseError, TrustError};

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Credential is not trusted.
    #[error("trust error: {0}")]
    Trust(#[from] TrustError),

    /// Local keys are not bound to the credential.
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),

    /// Classification policy denied access.
    #[error("authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// Encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Single-use material was used twice.
    #[error("replay or reuse: {0}")]
    ReplayOrReuse(#[from] ReplayOrReuseError),

    /// A cached copy is no longer readable.
    #[error("copy not accessible: {0}")]
    Expiry(#[from] ExpiryError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Authority round trip failed.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    /// Invalid primitive input.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// No session was published in time.
    #[error("no session after {0:?}")]
    NotReady(Duration),

    /// A session is already published.
    #[error("session already established")]
    SessionExists,

    /// Invalid operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Errors the protocol wraps are surfaced under their own category.
impl From<ProtocolError> for KernelError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Trust(e) => Self::Trust(e),
            ProtocolError::Binding(e) => Self::Binding(e),
            ProtocolError::Crypto(e) => Self::Crypto(e),
            ProtocolError::Ephemeral(EphemeralError::Crypto(e)) => Self::Crypto(e),
            ProtocolError::Ephemeral(EphemeralError::Reuse(e)) => Self::ReplayOrReuse(e),
            ProtocolError::Rejected {
                code: RejectionCode::ReplayDetected,
                message,
            } => Self::ReplayOrReuse(ReplayOrReuseError::NonceReplayed(message)),
            other => Self::Protocol(other),
        }
    }
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
