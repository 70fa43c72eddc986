//! In-memory store
//!
//! Clones share the same map, so two handles behave like two browser tabs
//! looking at the same local storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    check_revision, parse_revision, revision_key, validate_key, KeyValueStore, Revision,
    StorageError,
};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Vec<u8>>,
    /// Maximum total bytes (keys + values), `None` for unbounded
    quota: Option<usize>,
}

impl Inner {
    fn used_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn insert(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Shared in-process key-value store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once `quota` bytes are in use
    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                quota: Some(quota),
            })),
        }
    }

    /// Change the quota on a live store (`None` removes it)
    pub fn set_quota(&self, quota: Option<usize>) -> Result<(), StorageError> {
        self.lock()?.quota = quota;
        Ok(())
    }

    /// Number of stored keys, revision counters included
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Lock("memory store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        self.lock()?.insert(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.entries.remove(key);
        Ok(())
    }

    fn get_versioned(&self, key: &str) -> Result<(Option<Vec<u8>>, Revision), StorageError> {
        let inner = self.lock()?;
        let revision = parse_revision(inner.entries.get(&revision_key(key)).map(Vec::as_slice));
        Ok((inner.entries.get(key).cloned(), revision))
    }

    fn set_versioned(
        &self,
        key: &str,
        expected: Revision,
        value: &[u8],
    ) -> Result<Revision, StorageError> {
        validate_key(key)?;
        let rev_key = revision_key(key);
        let mut inner = self.lock()?;

        let found = parse_revision(inner.entries.get(&rev_key).map(Vec::as_slice));
        check_revision(key, expected, found)?;

        let next = found + 1;
        let previous = inner.entries.get(key).cloned();
        inner.insert(key, value)?;
        if let Err(e) = inner.insert(&rev_key, next.to_string().as_bytes()) {
            match previous {
                Some(old) => inner.entries.insert(key.to_string(), old),
                None => inner.entries.remove(key),
            };
            return Err(e);
        }
        Ok(next)
    }
}
