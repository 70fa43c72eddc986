//! Typed JSON slots over the key-value store

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::RewardsError;
use crate::storage::{KeyValueStore, Revision, StorageError};

/// Keys whose stored value could not be decoded during a load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub corrupted: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.corrupted.is_empty()
    }

    pub(crate) fn merge(&mut self, other: &LoadReport) {
        self.corrupted.extend(other.corrupted.iter().cloned());
    }
}

/// One key of rewards state plus the revision we last saw for it
#[derive(Debug)]
pub(crate) struct Slot<T> {
    key: &'static str,
    revision: Revision,
    _value: PhantomData<fn() -> T>,
}

impl<T> Slot<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Read the slot. Absent or undecodable values fall back to `T::default()`;
    /// the latter is recorded in `report`.
    pub fn load(
        key: &'static str,
        store: &dyn KeyValueStore,
        report: &mut LoadReport,
    ) -> Result<(Self, T), RewardsError> {
        let (raw, revision) = store.get_versioned(key)?;
        let slot = Self {
            key,
            revision,
            _value: PhantomData,
        };

        let Some(bytes) = raw else {
            tracing::debug!("No stored value for '{}', using default", key);
            return Ok((slot, T::default()));
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok((slot, value)),
            Err(e) => {
                tracing::warn!("Stored value for '{}' is unreadable ({}); using default", key, e);
                report.corrupted.push(key.to_string());
                Ok((slot, T::default()))
            }
        }
    }

    /// Write the full value, failing if another writer got there first
    pub fn save(&mut self, store: &dyn KeyValueStore, value: &T) -> Result<(), RewardsError> {
        let bytes = serde_json::to_vec(value)?;
        match store.set_versioned(self.key, self.revision, &bytes) {
            Ok(next) => {
                tracing::debug!("Wrote '{}' at revision {}", self.key, next);
                self.revision = next;
                Ok(())
            }
            Err(StorageError::Conflict { key, expected, found }) => {
                tracing::warn!(
                    "Write to '{}' rejected: expected revision {}, store has {}",
                    key,
                    expected,
                    found
                );
                Err(RewardsError::Conflict { key })
            }
            Err(e) => Err(e.into()),
        }
    }
}
