//! SQLite schema versions.
//!
//! `MIGRATIONS[i]` takes the schema from version `i` to `i + 1`. The applied
//! version is recorded in `store_schema`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Scripts in application order.
const MIGRATIONS: &[&str] = &[V1_COPIES_AND_KEYS];

/// Version a fully migrated database reports.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to run on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS store_schema (
            version INTEGER PRIMARY KEY,
            installed_at INTEGER NOT NULL
        );",
    )?;

    let installed: u32 = conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM store_schema",
        [],
        |row| row.get(0),
    )?;
    if installed > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {installed} is ahead of this build ({CURRENT_VERSION})"
        )));
    }
    if installed == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, script) in MIGRATIONS.iter().enumerate().skip(installed as usize) {
        tx.execute_batch(script)?;
        tx.execute(
            "INSERT INTO store_schema (version, installed_at) VALUES (?1, ?2)",
            rusqlite::params![index as u32 + 1, clearance_core::now_millis()],
        )?;
    }
    tx.commit()?;
    tracing::debug!(from = installed, to = CURRENT_VERSION, "store schema migrated");
    Ok(())
}

const V1_COPIES_AND_KEYS: &str = r#"
    -- One row per successful retrieval, keyed by the ephemeral DID
    CREATE TABLE document_copies (
        ephemeral_id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        copy_id TEXT NOT NULL,
        content BLOB NOT NULL,            -- CBOR CopyContent
        created_at INTEGER NOT NULL,      -- Unix ms
        expires_at INTEGER NOT NULL,      -- Unix ms
        view_count INTEGER NOT NULL DEFAULT 0,
        max_views INTEGER NOT NULL,       -- -1 = unlimited
        last_viewed_at INTEGER,
        status TEXT NOT NULL CHECK (status IN ('active', 'expired', 'viewed', 'revoked'))
    );
    CREATE INDEX idx_copies_status ON document_copies(status);
    CREATE INDEX idx_copies_expires ON document_copies(expires_at);
    CREATE INDEX idx_copies_document ON document_copies(document_id);

    -- Identity seeds by label
    CREATE TABLE key_material (
        label TEXT PRIMARY KEY,
        seed BLOB NOT NULL,
        created_at INTEGER NOT NULL
    );
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn
    }

    fn installed_version(conn: &Connection) -> u32 {
        conn.query_row("SELECT MAX(version) FROM store_schema", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_fresh_database_gets_every_table() {
        let conn = migrated();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        for expected in ["document_copies", "key_material", "store_schema"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert_eq!(installed_version(&conn), CURRENT_VERSION);
    }

    #[test]
    fn test_rerun_is_a_no_op() {
        let mut conn = migrated();
        migrate(&mut conn).unwrap();
        let rows: u32 = conn
            .query_row("SELECT COUNT(*) FROM store_schema", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_refused() {
        let mut conn = migrated();
        conn.execute(
            "INSERT INTO store_schema (version, installed_at) VALUES (?1, 0)",
            [CURRENT_VERSION + 1],
        )
        .unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let conn = migrated();
        let result = conn.execute(
            "INSERT INTO document_copies (ephemeral_id, document_id, copy_id, content,
                created_at, expires_at, max_views, status)
             VALUES ('e', 'd', 'c', x'00', 0, 1, -1, 'resurrected')",
            [],
        );
        assert!(result.is_err());
    }
}
