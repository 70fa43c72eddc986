//! Directory-backed store: one file per key
//!
//! Writes go to a temp file that is renamed over the target, under an
//! exclusive lock on `<dir>/.store.lock`, so concurrent CLI invocations
//! never observe a half-written value.
//!
//! A versioned write renames the revision file first and the value file
//! second. A crash in between leaves the old value under a bumped revision,
//! which reads as an unchanged value: holders of the old revision conflict
//! and reload, and the interrupted write is simply lost.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::{
    check_revision, parse_revision, revision_key, validate_key, KeyValueStore, Revision,
    StorageError,
};

const LOCK_FILE: &str = ".store.lock";

/// Key-value store persisted as plain files in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        tracing::debug!("Opened file store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }

    fn open_lock_file(&self) -> Result<(File, PathBuf), StorageError> {
        let lock_path = self.dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StorageError::io(&lock_path, e))?;
        Ok((lock_file, lock_path))
    }

    /// Acquire the directory-wide write lock.
    ///
    /// The lock is released when the returned file is dropped.
    fn lock_exclusive(&self) -> Result<File, StorageError> {
        let (lock_file, lock_path) = self.open_lock_file()?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::Lock(format!("{}: {e}", lock_path.display())))?;
        Ok(lock_file)
    }

    /// Shared lock for reads that must not interleave with a write
    fn lock_shared(&self) -> Result<File, StorageError> {
        let (lock_file, lock_path) = self.open_lock_file()?;
        lock_file
            .lock_shared()
            .map_err(|e| StorageError::Lock(format!("{}: {e}", lock_path.display())))?;
        Ok(lock_file)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Temp file + fsync + rename. Caller holds the lock.
    fn write_atomic(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let temp_path = self.dir.join(format!(".{key}.tmp"));

        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StorageError::io(&temp_path, e))?;
        temp_file
            .write_all(value)
            .and_then(|()| temp_file.sync_all())
            .map_err(|e| StorageError::io(&temp_path, e))?;

        std::fs::rename(&temp_path, &path).map_err(|e| StorageError::io(&path, e))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.read(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let _lock = self.lock_exclusive()?;
        self.write_atomic(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _lock = self.lock_exclusive()?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn get_versioned(&self, key: &str) -> Result<(Option<Vec<u8>>, Revision), StorageError> {
        let rev_key = revision_key(key);
        let _lock = self.lock_shared()?;
        let revision = parse_revision(self.read(&rev_key)?.as_deref());
        Ok((self.read(key)?, revision))
    }

    fn set_versioned(
        &self,
        key: &str,
        expected: Revision,
        value: &[u8],
    ) -> Result<Revision, StorageError> {
        let rev_key = revision_key(key);
        let _lock = self.lock_exclusive()?;

        let found = parse_revision(self.read(&rev_key)?.as_deref());
        check_revision(key, expected, found)?;

        let next = found + 1;
        self.write_atomic(&rev_key, next.to_string().as_bytes())?;
        self.write_atomic(key, value)?;
        Ok(next)
    }
}
