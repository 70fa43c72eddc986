//! Settings configuration types

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::rewards::DEFAULT_CONVERSION_RATE;
use crate::storage::{FileStore, KeyValueStore, SqliteStore};

/// Which storage backend holds rewards state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `rewards.db` in the data directory
    #[default]
    Sqlite,
    /// One file per key under `store/` in the data directory
    Files,
}

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Wallet credit per converted point
    #[serde(default = "default_conversion_rate")]
    pub conversion_rate: f64,

    /// Storage backend for badges, points and history
    #[serde(default)]
    pub storage: StorageBackend,

    /// Directory for rewards data. Empty means the global config directory.
    #[serde(default)]
    pub data_dir: String,
}

fn default_conversion_rate() -> f64 {
    DEFAULT_CONVERSION_RATE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conversion_rate: default_conversion_rate(),
            storage: StorageBackend::default(),
            data_dir: String::new(),
        }
    }
}

impl Settings {
    /// Data directory, falling back to `fallback` when unset
    pub fn resolved_data_dir(&self, fallback: &Path) -> PathBuf {
        let trimmed = self.data_dir.trim();
        if trimmed.is_empty() {
            fallback.to_path_buf()
        } else {
            PathBuf::from(trimmed)
        }
    }

    /// Open the configured backend rooted at `data_dir`
    pub fn open_store(&self, data_dir: &Path) -> Result<Arc<dyn KeyValueStore>> {
        let store: Arc<dyn KeyValueStore> = match self.storage {
            StorageBackend::Sqlite => {
                let path = data_dir.join("rewards.db");
                Arc::new(
                    SqliteStore::open(&path)
                        .with_context(|| format!("Failed to open rewards db: {}", path.display()))?,
                )
            }
            StorageBackend::Files => {
                let dir = data_dir.join("store");
                Arc::new(
                    FileStore::open(&dir)
                        .with_context(|| format!("Failed to open store dir: {}", dir.display()))?,
                )
            }
        };
        Ok(store)
    }
}
