//! Document cache: eviction rules over a [`Store`].
//!
//! A copy is valid while `now < expires_at` and, for limited copies,
//! `view_count < max_views`. Checking validity flips a lapsed copy's status;
//! [`DocumentCache::sweep`] deletes everything that is no longer valid.
//! There is no LRU and no size bound.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use clearance_core::{DocumentId, EphemeralId};

use crate::copy::{
    CopyContent, CopyStatus, CopyUpdate, MaxViews, RemainingViews, StoredDocumentCopy,
};
use crate::error::{ExpiryError, Result, StoreError};
use crate::traits::Store;

/// Defaults for copies whose authority sets no policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a copy.
    pub default_ttl: Duration,
    /// View limit, `-1` for unlimited.
    pub default_max_views: MaxViews,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(24 * 60 * 60),
            default_max_views: MaxViews::Unlimited,
        }
    }
}

/// Result of [`DocumentCache::record_view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOutcome {
    /// Whether the view was counted.
    pub allowed: bool,
    /// Views left after this one; `Count(0)` when denied.
    pub remaining: RemainingViews,
    /// Why the view was denied.
    pub reason: Option<ExpiryError>,
}

impl ViewOutcome {
    fn from_update(result: std::result::Result<RemainingViews, ExpiryError>) -> Self {
        match result {
            Ok(remaining) => Self {
                allowed: true,
                remaining,
                reason: None,
            },
            Err(reason) => Self {
                allowed: false,
                remaining: RemainingViews::Count(0),
                reason: Some(reason),
            },
        }
    }
}

/// A cached copy without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub ephemeral_id: EphemeralId,
    pub document_id: DocumentId,
    pub copy_id: String,
    pub status: CopyStatus,
    pub created_at: i64,
    pub expires_at: i64,
    pub view_count: u32,
    pub max_views: MaxViews,
    pub last_viewed_at: Option<i64>,
}

impl From<&StoredDocumentCopy> for DocumentSummary {
    fn from(copy: &StoredDocumentCopy) -> Self {
        Self {
            ephemeral_id: copy.ephemeral_id,
            document_id: copy.document_id.clone(),
            copy_id: copy.copy_id.clone(),
            status: copy.status,
            created_at: copy.created_at,
            expires_at: copy.expires_at,
            view_count: copy.view_count,
            max_views: copy.max_views,
            last_viewed_at: copy.last_viewed_at,
        }
    }
}

/// Parameters of a new cached copy.
#[derive(Debug, Clone)]
pub struct NewCopy {
    pub ephemeral_id: EphemeralId,
    pub document_id: DocumentId,
    pub copy_id: String,
    pub content: CopyContent,
    /// Authority-set expiry; falls back to `now + default_ttl`.
    pub expires_at: Option<i64>,
    /// Authority-set view limit; falls back to the configured default.
    pub max_views: Option<MaxViews>,
}

/// Eviction-governed cache of document copies.
pub struct DocumentCache<S: Store + ?Sized> {
    store: Arc<S>,
    config: CacheConfig,
}

impl<S: Store + ?Sized> Clone for DocumentCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config,
        }
    }
}

impl<S: Store + ?Sized> DocumentCache<S> {
    pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a new active copy.
    pub async fn insert(&self, new: NewCopy, now: i64) -> Result<StoredDocumentCopy> {
        let ttl_ms = i64::try_from(self.config.default_ttl.as_millis()).unwrap_or(i64::MAX);
        let copy = StoredDocumentCopy {
            ephemeral_id: new.ephemeral_id,
            document_id: new.document_id,
            copy_id: new.copy_id,
            content: new.content,
            created_at: now,
            expires_at: new.expires_at.unwrap_or_else(|| now.saturating_add(ttl_ms)),
            view_count: 0,
            max_views: new.max_views.unwrap_or(self.config.default_max_views),
            last_viewed_at: None,
            status: CopyStatus::Active,
        };
        self.store.insert_copy(&copy).await?;
        tracing::info!(
            ephemeral_id = %copy.ephemeral_id,
            document_id = %copy.document_id,
            expires_at = copy.expires_at,
            "document copy cached"
        );
        Ok(copy)
    }

    /// Fetch a copy regardless of validity.
    pub async fn get(&self, id: &EphemeralId) -> Result<Option<StoredDocumentCopy>> {
        self.store.get_copy(id).await
    }

    /// Whether the copy is readable at `now`. Lapsed copies have their status
    /// flipped; unknown copies are simply not valid.
    pub async fn is_valid(&self, id: &EphemeralId, now: i64) -> Result<bool> {
        match self.store.update_copy(id, CopyUpdate::Refresh { now }).await {
            Ok(result) => Ok(result.is_ok()),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Count one view if the copy is still valid.
    ///
    /// A denied view is reported in the outcome, not as an error, and leaves
    /// the copy's counters untouched.
    pub async fn record_view(&self, id: &EphemeralId, now: i64) -> Result<ViewOutcome> {
        let result = self
            .store
            .update_copy(id, CopyUpdate::RecordView { now })
            .await?;
        let outcome = ViewOutcome::from_update(result);
        match &outcome.reason {
            None => tracing::debug!(ephemeral_id = %id, remaining = ?outcome.remaining, "view recorded"),
            Some(reason) => tracing::debug!(ephemeral_id = %id, %reason, "view denied"),
        }
        Ok(outcome)
    }

    /// Move an active copy to `Revoked`. Returns false if it had already
    /// expired, been used up or been revoked.
    pub async fn revoke(&self, id: &EphemeralId) -> Result<bool> {
        let revoked = self.store.update_copy(id, CopyUpdate::Revoke).await?.is_ok();
        if revoked {
            tracing::info!(ephemeral_id = %id, "document copy revoked");
        }
        Ok(revoked)
    }

    /// Summaries of cached copies, refreshing each one's status first.
    pub async fn list(&self, include_expired: bool, now: i64) -> Result<Vec<DocumentSummary>> {
        let mut summaries = Vec::new();
        for copy in self.store.list_copies().await? {
            self.store
                .update_copy(&copy.ephemeral_id, CopyUpdate::Refresh { now })
                .await?;
            if let Some(copy) = self.store.get_copy(&copy.ephemeral_id).await? {
                if include_expired || copy.status == CopyStatus::Active {
                    summaries.push(DocumentSummary::from(&copy));
                }
            }
        }
        Ok(summaries)
    }

    /// Delete every copy that is no longer valid. Returns how many went.
    pub async fn sweep(&self, now: i64) -> Result<usize> {
        let mut removed = 0;
        for copy in self.store.list_copies().await? {
            let result = self
                .store
                .update_copy(&copy.ephemeral_id, CopyUpdate::Refresh { now })
                .await?;
            if result.is_err() && self.store.delete_copy(&copy.ephemeral_id).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "swept invalid document copies");
        }
        Ok(removed)
    }
}
