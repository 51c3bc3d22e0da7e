//! Storage failures and the reasons a copy stops being readable.

use thiserror::Error;

use clearance_core::EphemeralId;

/// A backend operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Document copy not found.
    #[error("document copy not found: {0}")]
    NotFound(EphemeralId),

    /// A copy with this ephemeral id already exists.
    #[error("document copy already exists: {0}")]
    AlreadyExists(EphemeralId),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a cached copy can no longer be read.
///
/// Carried inside a denied [`ViewOutcome`](crate::ViewOutcome); the read path
/// never fails with it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpiryError {
    #[error("copy expired at {expires_at}")]
    Expired { expires_at: i64 },

    #[error("view limit of {max_views} reached")]
    ViewLimitReached { max_views: u32 },

    #[error("copy was revoked")]
    Revoked,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
