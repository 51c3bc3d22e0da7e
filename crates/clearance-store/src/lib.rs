//! # Clearance Kernel Store
//!
//! Local persistence for the Clearance Kernel: cached document copies and
//! long-term key material, behind a trait with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`DocumentCache`] - TTL and view-count eviction over a store
//! - [`StoredDocumentCopy`] - One cached disclosure, keyed by ephemeral id
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clearance_store::{CacheConfig, DocumentCache, SqliteStore};
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("wallet.db").unwrap());
//!     let cache = DocumentCache::new(store, CacheConfig::default());
//!     let removed = cache.sweep(clearance_core::now_millis()).await.unwrap();
//!     println!("removed {removed} stale copies");
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic updates**: every view, refresh and revocation is a single
//!   read-modify-write inside the store
//! - **Monotonic status**: `active` may become `expired`, `viewed` or
//!   `revoked`; nothing ever becomes `active` again

pub mod cache;
pub mod copy;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use cache::{CacheConfig, DocumentCache, DocumentSummary, NewCopy, ViewOutcome};
pub use copy::{
    CopyContent, CopyStatus, CopyUpdate, MaxViews, RemainingViews, StoredDocumentCopy,
};
pub use error::{ExpiryError, Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Store, UpdateResult};
