//! Volatile [`Store`]: same update rules as [`crate::SqliteStore`], nothing
//! survives a drop. Used by tests and short-lived wallets.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use zeroize::Zeroizing;

use clearance_core::EphemeralId;

use crate::copy::{CopyUpdate, StoredDocumentCopy};
use crate::error::{Result, StoreError};
use crate::traits::{Store, UpdateResult};

/// Copies and seeds behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Copies by ephemeral id.
    copies: BTreeMap<EphemeralId, StoredDocumentCopy>,

    /// Identity seeds by label.
    keys: HashMap<String, Zeroizing<[u8; 32]>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_copy(&self, copy: &StoredDocumentCopy) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.copies.contains_key(&copy.ephemeral_id) {
            return Err(StoreError::AlreadyExists(copy.ephemeral_id));
        }
        inner.copies.insert(copy.ephemeral_id, copy.clone());
        Ok(())
    }

    async fn get_copy(&self, id: &EphemeralId) -> Result<Option<StoredDocumentCopy>> {
        Ok(self.inner.read().copies.get(id).cloned())
    }

    async fn list_copies(&self) -> Result<Vec<StoredDocumentCopy>> {
        let mut copies: Vec<_> = self.inner.read().copies.values().cloned().collect();
        copies.sort_by_key(|c| c.created_at);
        Ok(copies)
    }

    async fn update_copy(&self, id: &EphemeralId, update: CopyUpdate) -> Result<UpdateResult> {
        let mut inner = self.inner.write();
        let copy = inner.copies.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        Ok(copy.apply(update))
    }

    async fn delete_copy(&self, id: &EphemeralId) -> Result<bool> {
        Ok(self.inner.write().copies.remove(id).is_some())
    }

    async fn put_key_material(&self, label: &str, seed: &Zeroizing<[u8; 32]>) -> Result<()> {
        self.inner.write().keys.insert(label.to_string(), seed.clone());
        Ok(())
    }

    async fn get_key_material(&self, label: &str) -> Result<Option<Zeroizing<[u8; 32]>>> {
        Ok(self.inner.read().keys.get(label).cloned())
    }

    async fn delete_key_material(&self, label: &str) -> Result<bool> {
        Ok(self.inner.write().keys.remove(label).is_some())
    }
}
