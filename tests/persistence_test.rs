//! State survives reopening, stale sessions are rejected, bad data is reported

mod common;

use std::sync::Arc;

use campus_rewards::rewards::{HistoryEntry, Reward, RewardsError, RewardsService};
use campus_rewards::storage::{keys, KeyValueStore, MemoryStore};
use common::{durable_backends, item};
use tempfile::tempdir;

fn populate(service: &mut RewardsService) {
    let ledger = service.ledger_mut();
    ledger.add_points(900).unwrap();
    ledger.add_reward("Speed Demon", "Typed fast", "zap").unwrap();
    ledger.add_reward("Night Owl", "", "🦉").unwrap();
    service.redeem("lamp").unwrap();
    service.convert_with_rate(333, 0.3).unwrap();
}

#[test]
fn test_state_survives_reopen_on_every_backend() {
    let dir = tempdir().unwrap();

    for (name, store) in durable_backends(dir.path()) {
        let mut service = RewardsService::open(store, vec![item("lamp", 120)], 0.5).unwrap();
        populate(&mut service);

        let rewards = service.ledger().rewards().to_vec();
        let points = service.ledger().total_points();
        let history = service.engine().history().to_vec();
        drop(service);

        let reopened = durable_backends(dir.path())
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, store)| store)
            .unwrap();

        let service = RewardsService::open(reopened, vec![item("lamp", 120)], 0.5).unwrap();
        assert_eq!(service.ledger().rewards(), rewards.as_slice(), "{name}");
        assert_eq!(service.ledger().total_points(), points, "{name}");
        assert_eq!(service.engine().history(), history.as_slice(), "{name}");
        assert_eq!(points, 900 - 120 - 333, "{name}");
        assert!(service.load_report().is_clean(), "{name}");
    }
}

#[test]
fn test_stored_bytes_reencode_identically() {
    let store = MemoryStore::new();
    let shared: Arc<dyn KeyValueStore> = Arc::new(store.clone());
    let mut service = RewardsService::open(shared, vec![item("lamp", 120)], 0.5).unwrap();
    populate(&mut service);

    let rewards_raw = store.get(keys::BADGES).unwrap().unwrap();
    let points_raw = store.get(keys::POINTS).unwrap().unwrap();
    let history_raw = store.get(keys::HISTORY).unwrap().unwrap();

    let rewards: Vec<Reward> = serde_json::from_slice(&rewards_raw).unwrap();
    let points: i64 = serde_json::from_slice(&points_raw).unwrap();
    let history: Vec<HistoryEntry> = serde_json::from_slice(&history_raw).unwrap();

    assert_eq!(serde_json::to_vec(&rewards).unwrap(), rewards_raw);
    assert_eq!(serde_json::to_vec(&points).unwrap(), points_raw);
    assert_eq!(serde_json::to_vec(&history).unwrap(), history_raw);
}

#[test]
fn test_stale_session_cannot_overwrite() {
    let dir = tempdir().unwrap();

    for (name, store) in durable_backends(dir.path()) {
        let mut first = RewardsService::open(Arc::clone(&store), vec![], 0.5).unwrap();
        let mut second = RewardsService::open(store, vec![], 0.5).unwrap();

        first.ledger_mut().add_points(100).unwrap();

        let err = second.ledger_mut().add_points(7).unwrap_err();
        assert!(
            matches!(err, RewardsError::Conflict { ref key } if key == keys::POINTS),
            "{name}: {err}"
        );
        assert_eq!(second.ledger().total_points(), 0, "{name}");

        second.reload().unwrap();
        assert_eq!(second.ledger_mut().add_points(7).unwrap(), 107, "{name}");

        first.reload().unwrap();
        assert_eq!(first.ledger().total_points(), 107, "{name}");
    }
}

#[test]
fn test_stale_history_write_refunds_points() {
    let store = MemoryStore::new();
    let shared: Arc<dyn KeyValueStore> = Arc::new(store.clone());
    let catalog = vec![item("lamp", 50)];

    let mut first = RewardsService::open(Arc::clone(&shared), catalog.clone(), 0.5).unwrap();
    first.ledger_mut().add_points(200).unwrap();

    let mut second = RewardsService::open(shared, catalog, 0.5).unwrap();
    first.redeem("lamp").unwrap();

    // Second session sees the fresh balance but a stale history
    second.ledger_mut().reload().unwrap();
    assert_eq!(second.ledger().total_points(), 150);
    let err = second.redeem("lamp").unwrap_err();
    assert!(matches!(err, RewardsError::Conflict { ref key } if key == keys::HISTORY));
    assert_eq!(second.ledger().total_points(), 150);
    assert_eq!(second.engine().history().len(), 0);

    second.reload().unwrap();
    assert_eq!(second.engine().history().len(), 1);
    assert_eq!(second.ledger().total_points(), 150);
}

#[test]
fn test_corrupt_state_loads_as_defaults() {
    let store = MemoryStore::new();
    store.set(keys::POINTS, b"\"lots\"").unwrap();
    store.set(keys::HISTORY, b"[{\"id\":").unwrap();
    store.set(keys::BADGES, b"[]").unwrap();

    let mut service =
        RewardsService::open(Arc::new(store.clone()), vec![item("lamp", 5)], 0.5).unwrap();

    assert_eq!(service.ledger().total_points(), 0);
    assert!(service.engine().history().is_empty());
    let report = service.load_report();
    assert_eq!(
        report.corrupted,
        vec![keys::POINTS.to_string(), keys::HISTORY.to_string()]
    );

    // The next write replaces the unreadable value
    service.ledger_mut().add_points(10).unwrap();
    assert_eq!(store.get(keys::POINTS).unwrap().unwrap(), b"10");
}

#[test]
fn test_full_store_leaves_state_untouched() {
    let store = MemoryStore::new();
    let mut service =
        RewardsService::open(Arc::new(store.clone()), vec![item("lamp", 5)], 0.5).unwrap();
    service.ledger_mut().add_points(40).unwrap();

    store.set_quota(Some(64)).unwrap();
    let err = service
        .ledger_mut()
        .add_reward(&"x".repeat(200), "too big to fit", "star")
        .unwrap_err();
    assert!(matches!(err, RewardsError::Storage(_)));
    assert!(service.ledger().rewards().is_empty());
    assert_eq!(service.ledger().total_points(), 40);
}
