//! Store trait: the abstract interface for local persistence.
//!
//! This trait keeps the cache storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use zeroize::Zeroizing;

use clearance_core::EphemeralId;

use crate::copy::{CopyUpdate, RemainingViews, StoredDocumentCopy};
use crate::error::{ExpiryError, Result};

/// Outcome of a [`CopyUpdate`] on a stored copy.
pub type UpdateResult = std::result::Result<RemainingViews, ExpiryError>;

/// The Store trait: async interface for copy and key persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, `spawn_blocking` is used internally.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Document Copies
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new copy. Fails with `AlreadyExists` if the key is taken.
    async fn insert_copy(&self, copy: &StoredDocumentCopy) -> Result<()>;

    /// Get a copy by its ephemeral id.
    async fn get_copy(&self, id: &EphemeralId) -> Result<Option<StoredDocumentCopy>>;

    /// All copies, oldest first.
    async fn list_copies(&self) -> Result<Vec<StoredDocumentCopy>>;

    /// Read, apply `update`, and persist any change as one atomic step.
    ///
    /// Fails with `NotFound` for an unknown id. A denied update still
    /// persists a status flip (e.g. active to expired).
    async fn update_copy(&self, id: &EphemeralId, update: CopyUpdate) -> Result<UpdateResult>;

    /// Delete a copy. Returns whether it existed.
    async fn delete_copy(&self, id: &EphemeralId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Key Material
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an identity seed under `label`, replacing any previous one.
    async fn put_key_material(&self, label: &str, seed: &Zeroizing<[u8; 32]>) -> Result<()>;

    /// Load the seed stored under `label`.
    async fn get_key_material(&self, label: &str) -> Result<Option<Zeroizing<[u8; 32]>>>;

    /// Delete the seed stored under `label`. Returns whether it existed.
    async fn delete_key_material(&self, label: &str) -> Result<bool>;
}
