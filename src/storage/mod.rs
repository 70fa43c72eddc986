//! Durable key-value persistence for rewards state
//!
//! The rewards core only ever talks to a [`KeyValueStore`]. Three backends
//! are provided:
//!
//! - [`MemoryStore`]: shared in-process map, used by tests and as a scratch store
//! - [`FileStore`]: one file per key in a directory (`~/.campus-rewards/store/`)
//! - [`SqliteStore`]: a single `kv` table in `~/.campus-rewards/rewards.db`
//!
//! # Revisions
//!
//! Every key carries a revision counter. Writers that go through
//! [`KeyValueStore::set_versioned`] name the revision they last read; if
//! somebody else wrote in between the write is rejected with
//! [`StorageError::Conflict`] instead of silently overwriting.

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

/// Per-key write counter. A key that was never written has revision 0.
pub type Revision = u64;

/// Fixed keys used by the rewards core
pub mod keys {
    /// Serialized list of earned badges
    pub const BADGES: &str = "rewards.badges";
    /// Serialized point balance
    pub const POINTS: &str = "rewards.points";
    /// Serialized redemption history (newest first)
    pub const HISTORY: &str = "rewards.history";
}

/// Errors raised by storage backends
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to acquire store lock: {0}")]
    Lock(String),

    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Revision conflict on '{key}': expected {expected}, found {found}")]
    Conflict {
        key: String,
        expected: Revision,
        found: Revision,
    },

    #[error("Invalid key: '{0}'")]
    InvalidKey(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Minimal durable key-value interface.
///
/// Values are opaque bytes. Implementations must make a single `set` atomic
/// (a reader sees either the old or the new value, never a torn one).
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Absent keys return `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Overwrite a value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a value. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Read a value together with its current revision.
    ///
    /// The default reads the revision before the value, so a write landing
    /// in between pairs a newer value with an older revision. That costs a
    /// spurious conflict on the next write, never a lost update. Backends
    /// that can lock override this to read both at once.
    fn get_versioned(&self, key: &str) -> Result<(Option<Vec<u8>>, Revision), StorageError> {
        let revision = parse_revision(self.get(&revision_key(key))?.as_deref());
        let value = self.get(key)?;
        Ok((value, revision))
    }

    /// Write a value only if the stored revision still equals `expected`.
    ///
    /// Returns the new revision. The default implementation is not atomic
    /// across processes; backends override it where they can lock.
    fn set_versioned(
        &self,
        key: &str,
        expected: Revision,
        value: &[u8],
    ) -> Result<Revision, StorageError> {
        let found = parse_revision(self.get(&revision_key(key))?.as_deref());
        check_revision(key, expected, found)?;
        let next = found + 1;
        self.set(&revision_key(key), next.to_string().as_bytes())?;
        self.set(key, value)?;
        Ok(next)
    }
}

/// Companion key holding the revision counter of `key`
pub fn revision_key(key: &str) -> String {
    format!("{key}.rev")
}

/// Decode a stored revision. Missing or unreadable counters count as 0.
pub(crate) fn parse_revision(raw: Option<&[u8]>) -> Revision {
    raw.and_then(|bytes| std::str::from_utf8(bytes).ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

pub(crate) fn check_revision(
    key: &str,
    expected: Revision,
    found: Revision,
) -> Result<(), StorageError> {
    if expected == found {
        Ok(())
    } else {
        Err(StorageError::Conflict {
            key: key.to_string(),
            expected,
            found,
        })
    }
}

/// Keys become file names and SQL values, so keep them boring.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
