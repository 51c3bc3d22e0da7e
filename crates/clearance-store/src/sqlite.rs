//! File-backed [`Store`] for wallets.
//!
//! Each call runs on the blocking pool with the single connection locked.
//! Copy updates run inside an immediate transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use zeroize::Zeroizing;

use clearance_core::{now_millis, DocumentId, EphemeralId};

use crate::copy::{CopyContent, CopyStatus, CopyUpdate, MaxViews, StoredDocumentCopy};
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Store, UpdateResult};

const COPY_COLUMNS: &str = "ephemeral_id, document_id, copy_id, content, created_at, \
     expires_at, view_count, max_views, last_viewed_at, status";

/// Copies and key material in one SQLite database.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path` and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {e}")),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {e}")),
            ))
        })?
    }
}

/// Column values of one `document_copies` row, before validation.
struct CopyRow {
    ephemeral_id: String,
    document_id: String,
    copy_id: String,
    content: Vec<u8>,
    created_at: i64,
    expires_at: i64,
    view_count: i64,
    max_views: i64,
    last_viewed_at: Option<i64>,
    status: String,
}

impl CopyRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            ephemeral_id: row.get("ephemeral_id")?,
            document_id: row.get("document_id")?,
            copy_id: row.get("copy_id")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
            view_count: row.get("view_count")?,
            max_views: row.get("max_views")?,
            last_viewed_at: row.get("last_viewed_at")?,
            status: row.get("status")?,
        })
    }
}

impl TryFrom<CopyRow> for StoredDocumentCopy {
    type Error = StoreError;

    fn try_from(row: CopyRow) -> Result<Self> {
        let ephemeral_id = EphemeralId::from_did(&row.ephemeral_id)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let content: CopyContent = ciborium::from_reader(row.content.as_slice())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let view_count = u32::try_from(row.view_count)
            .map_err(|_| StoreError::InvalidData(format!("view_count {}", row.view_count)))?;
        let max_views = MaxViews::try_from(row.max_views).map_err(StoreError::InvalidData)?;
        let status = CopyStatus::parse(&row.status)
            .ok_or_else(|| StoreError::InvalidData(format!("status {}", row.status)))?;

        Ok(Self {
            ephemeral_id,
            document_id: DocumentId::new(row.document_id),
            copy_id: row.copy_id,
            content,
            created_at: row.created_at,
            expires_at: row.expires_at,
            view_count,
            max_views,
            last_viewed_at: row.last_viewed_at,
            status,
        })
    }
}

fn encode_content(content: &CopyContent) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(content, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn select_copy(conn: &Connection, id: &EphemeralId) -> Result<Option<StoredDocumentCopy>> {
    conn.query_row(
        &format!("SELECT {COPY_COLUMNS} FROM document_copies WHERE ephemeral_id = ?1"),
        params![id.to_did()],
        CopyRow::read,
    )
    .optional()?
    .map(StoredDocumentCopy::try_from)
    .transpose()
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_copy(&self, copy: &StoredDocumentCopy) -> Result<()> {
        let copy = copy.clone();
        let content = encode_content(&copy.content)?;

        self.blocking(move |conn| {
            let inserted = conn.execute(
                &format!(
                    "INSERT INTO document_copies ({COPY_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(ephemeral_id) DO NOTHING"
                ),
                params![
                    copy.ephemeral_id.to_did(),
                    copy.document_id.as_str(),
                    copy.copy_id,
                    content,
                    copy.created_at,
                    copy.expires_at,
                    i64::from(copy.view_count),
                    i64::from(copy.max_views),
                    copy.last_viewed_at,
                    copy.status.as_str(),
                ],
            )?;
            if inserted == 0 {
                return Err(StoreError::AlreadyExists(copy.ephemeral_id));
            }
            Ok(())
        })
        .await
    }

    async fn get_copy(&self, id: &EphemeralId) -> Result<Option<StoredDocumentCopy>> {
        let id = *id;
        self.blocking(move |conn| select_copy(conn, &id)).await
    }

    async fn list_copies(&self) -> Result<Vec<StoredDocumentCopy>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COPY_COLUMNS} FROM document_copies ORDER BY created_at, ephemeral_id"
            ))?;
            let rows = stmt
                .query_map([], CopyRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(StoredDocumentCopy::try_from).collect()
        })
        .await
    }

    async fn update_copy(&self, id: &EphemeralId, update: CopyUpdate) -> Result<UpdateResult> {
        let id = *id;
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let mut copy = select_copy(&tx, &id)?.ok_or(StoreError::NotFound(id))?;
            let before = copy.clone();
            let outcome = copy.apply(update);

            if copy != before {
                tx.execute(
                    "UPDATE document_copies
                     SET view_count = ?2, last_viewed_at = ?3, status = ?4
                     WHERE ephemeral_id = ?1",
                    params![
                        id.to_did(),
                        i64::from(copy.view_count),
                        copy.last_viewed_at,
                        copy.status.as_str(),
                    ],
                )?;
            }

            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn delete_copy(&self, id: &EphemeralId) -> Result<bool> {
        let id = *id;
        self.blocking(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM document_copies WHERE ephemeral_id = ?1",
                params![id.to_did()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn put_key_material(&self, label: &str, seed: &Zeroizing<[u8; 32]>) -> Result<()> {
        let label = label.to_string();
        let seed = seed.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO key_material (label, seed, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(label) DO UPDATE SET seed = excluded.seed",
                params![label, seed.as_slice(), now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_key_material(&self, label: &str) -> Result<Option<Zeroizing<[u8; 32]>>> {
        let label = label.to_string();
        self.blocking(move |conn| {
            let bytes: Option<Zeroizing<Vec<u8>>> = conn
                .query_row(
                    "SELECT seed FROM key_material WHERE label = ?1",
                    params![label],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?
                .map(Zeroizing::new);

            bytes
                .map(|b| {
                    let seed: [u8; 32] = b.as_slice().try_into().map_err(|_| {
                        StoreError::InvalidData(format!("seed must be 32 bytes, got {}", b.len()))
                    })?;
                    Ok(Zeroizing::new(seed))
                })
                .transpose()
        })
        .await
    }

    async fn delete_key_material(&self, label: &str) -> Result<bool> {
        let label = label.to_string();
        self.blocking(move |conn| {
            let deleted =
                conn.execute("DELETE FROM key_material WHERE label = ?1", params![label])?;
            Ok(deleted > 0)
        })
        .await
    }
}
