//! Shared helpers for rewards integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use campus_rewards::rewards::{CatalogEntry, RewardsService};
use campus_rewards::storage::{FileStore, KeyValueStore, MemoryStore, SqliteStore};

/// Catalog entry with the given id and cost
pub fn item(id: &str, points_cost: i64) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        name: format!("Item {id}"),
        description: String::new(),
        points_cost,
        icon: "gift".to_string(),
        badge: None,
    }
}

/// A service over a fresh in-memory store. The returned store shares state.
pub fn memory_service(catalog: Vec<CatalogEntry>) -> (MemoryStore, RewardsService) {
    let store = MemoryStore::new();
    let service = RewardsService::open(Arc::new(store.clone()), catalog, 0.5)
        .expect("Failed to open service");
    (store, service)
}

/// Open a fresh handle on each durable backend rooted at `dir`
pub fn durable_backends(dir: &Path) -> Vec<(&'static str, Arc<dyn KeyValueStore>)> {
    vec![
        (
            "files",
            Arc::new(FileStore::open(dir.join("store")).expect("Failed to open file store")),
        ),
        (
            "sqlite",
            Arc::new(SqliteStore::open(&dir.join("rewards.db")).expect("Failed to open db")),
        ),
    ]
}
