//! SQLite-backed store
//!
//! Manages `~/.campus-rewards/rewards.db` with automatic schema migration.
//! Revisions live in a column next to the value instead of companion keys.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use super::{check_revision, validate_key, KeyValueStore, Revision, StorageError};

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// How long a writer waits on another process's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Key-value store in a single SQLite table
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // WAL lets a reader in one process coexist with a writer in another
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        tracing::debug!("Opened rewards db at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Lock("rewards db lock poisoned".to_string()))
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<i32, StorageError> {
        let conn = self.conn()?;
        let version =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
                r.get(0)
            })?;
        Ok(version)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
                r.get(0)
            })
            .unwrap_or(0);

        // Migration 2: revision column for optimistic concurrency
        if version < 2 {
            let has_revision: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('kv') WHERE name = 'revision'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_revision {
                conn.execute_batch("ALTER TABLE kv ADD COLUMN revision INTEGER NOT NULL DEFAULT 0;")?;
            }
            conn.execute(
                "INSERT OR REPLACE INTO schema_version VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |r| r.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3
            "#,
            rusqlite::params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn get_versioned(&self, key: &str) -> Result<(Option<Vec<u8>>, Revision), StorageError> {
        let conn = self.conn()?;
        let row: Option<(Vec<u8>, i64)> = conn
            .query_row(
                "SELECT value, revision FROM kv WHERE key = ?1",
                [key],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        Ok(match row {
            Some((value, revision)) => (Some(value), revision.max(0) as Revision),
            None => (None, 0),
        })
    }

    fn set_versioned(
        &self,
        key: &str,
        expected: Revision,
        value: &[u8],
    ) -> Result<Revision, StorageError> {
        validate_key(key)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let found: i64 = tx
            .query_row("SELECT revision FROM kv WHERE key = ?1", [key], |r| r.get(0))
            .optional()?
            .unwrap_or(0);
        let found = found.max(0) as Revision;
        check_revision(key, expected, found)?;

        let next = found + 1;
        tx.execute(
            r#"
            INSERT INTO kv (key, value, revision, updated_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET value = ?2, revision = ?3, updated_at = ?4
            "#,
            rusqlite::params![key, value, next as i64, Utc::now().timestamp_millis()],
        )?;
        tx.commit()?;
        Ok(next)
    }
}

/// Base schema (version 1). Later columns are added by migrations.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_migrate() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("rewards.db")).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);

        let conn = store.conn().unwrap();
        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('kv')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert!(columns.contains(&"revision".to_string()));
    }

    #[test]
    fn test_migrates_version_one_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA_SQL).unwrap();
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES ('rewards.points', X'3432', 0)",
                [],
            )
            .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let (value, rev) = store.get_versioned("rewards.points").unwrap();
        assert_eq!(value, Some(b"42".to_vec()));
        assert_eq!(rev, 0);
        assert_eq!(store.set_versioned("rewards.points", 0, b"43").unwrap(), 1);
    }

    #[test]
    fn test_plain_set_keeps_revision() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_versioned("k", 0, b"a").unwrap();
        store.set("k", b"b").unwrap();
        let (value, rev) = store.get_versioned("k").unwrap();
        assert_eq!(value, Some(b"b".to_vec()));
        assert_eq!(rev, 1);
    }

    #[test]
    fn test_conflict_leaves_row_untouched() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_versioned("k", 0, b"a").unwrap();
        let err = store.set_versioned("k", 0, b"b").unwrap_err();
        assert!(matches!(err, StorageError::Conflict { found: 1, .. }));
        assert_eq!(store.get("k").unwrap(), Some(b"a".to_vec()));
    }
}
