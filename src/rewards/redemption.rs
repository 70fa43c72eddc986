//! Redemption engine - spends ledger points on catalog items and wallet conversions
//!
//! History is append-only and kept newest-first. Each successful operation
//! debits the ledger first and then writes the full history list; if the
//! history write fails the debit is refunded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog;
use super::ledger::RewardsLedger;
use super::models::{
    CatalogEntry, EntryKind, EntryStatus, HistoryEntry, ItemSnapshot, CONVERSION_ICON,
    CONVERSION_ITEM_NAME,
};
use super::persist::{LoadReport, Slot};
use super::RewardsError;
use crate::storage::{keys, KeyValueStore};

/// Points-to-wallet rate used when none is configured
pub const DEFAULT_CONVERSION_RATE: f64 = 0.5;

/// Result of a redeem or convert call
#[derive(Debug, Clone, PartialEq)]
pub enum RedeemOutcome {
    /// The operation went through and this entry was recorded
    Redeemed(HistoryEntry),
    /// Not enough points; nothing changed
    Declined { shortfall: i64 },
}

impl RedeemOutcome {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, Self::Redeemed(_))
    }

    pub fn entry(&self) -> Option<&HistoryEntry> {
        match self {
            Self::Redeemed(entry) => Some(entry),
            Self::Declined { .. } => None,
        }
    }

    pub fn shortfall(&self) -> Option<i64> {
        match self {
            Self::Redeemed(_) => None,
            Self::Declined { shortfall } => Some(*shortfall),
        }
    }
}

/// Applies the catalog and the conversion rate against a [`RewardsLedger`]
pub struct RedemptionEngine {
    store: Arc<dyn KeyValueStore>,
    catalog: Vec<CatalogEntry>,
    conversion_rate: f64,
    history: Vec<HistoryEntry>,
    history_slot: Slot<Vec<HistoryEntry>>,
    report: LoadReport,
}

impl RedemptionEngine {
    /// Restore history from the store
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        catalog: Vec<CatalogEntry>,
        conversion_rate: f64,
    ) -> Result<Self, RewardsError> {
        validate_rate(conversion_rate)?;

        let mut report = LoadReport::default();
        let (history_slot, history): (_, Vec<HistoryEntry>) =
            Slot::load(keys::HISTORY, store.as_ref(), &mut report)?;

        tracing::debug!("Redemption history loaded: {} entries", history.len());

        Ok(Self {
            store,
            catalog,
            conversion_rate,
            history,
            history_slot,
            report,
        })
    }

    /// Re-read history from the store, keeping catalog and rate
    pub fn reload(&mut self) -> Result<(), RewardsError> {
        let mut report = LoadReport::default();
        let (history_slot, history) = Slot::load(keys::HISTORY, self.store.as_ref(), &mut report)?;
        self.history_slot = history_slot;
        self.history = history;
        self.report = report;
        Ok(())
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    pub fn catalog_item(&self, id: &str) -> Option<&CatalogEntry> {
        catalog::find(&self.catalog, id)
    }

    pub fn conversion_rate(&self) -> f64 {
        self.conversion_rate
    }

    /// Past redemptions and conversions, newest first
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Redeem a catalog entry now
    pub fn redeem(
        &mut self,
        ledger: &mut RewardsLedger,
        entry: &CatalogEntry,
    ) -> Result<RedeemOutcome, RewardsError> {
        self.redeem_at(ledger, entry, Utc::now())
    }

    /// Redeem the catalog entry with the given id
    pub fn redeem_by_id(
        &mut self,
        ledger: &mut RewardsLedger,
        catalog_id: &str,
    ) -> Result<RedeemOutcome, RewardsError> {
        let entry = self
            .catalog_item(catalog_id)
            .cloned()
            .ok_or_else(|| RewardsError::UnknownItem(catalog_id.to_string()))?;
        self.redeem(ledger, &entry)
    }

    /// Redeem a catalog entry with an explicit timestamp
    pub fn redeem_at(
        &mut self,
        ledger: &mut RewardsLedger,
        entry: &CatalogEntry,
        at: DateTime<Utc>,
    ) -> Result<RedeemOutcome, RewardsError> {
        if entry.points_cost <= 0 {
            return Err(RewardsError::InvalidInput(format!(
                "catalog item '{}' has non-positive cost {}",
                entry.id, entry.points_cost
            )));
        }

        let balance = ledger.total_points();
        if balance < entry.points_cost {
            let shortfall = entry.points_cost.saturating_sub(balance);
            tracing::debug!(
                "Declined '{}': costs {}, balance {}, short {}",
                entry.id,
                entry.points_cost,
                balance,
                shortfall
            );
            return Ok(RedeemOutcome::Declined { shortfall });
        }

        let record = HistoryEntry {
            id: format!("{}-{}", entry.id, at.timestamp_millis()),
            kind: EntryKind::Redemption,
            item: ItemSnapshot::from(entry),
            redeemed_at: at,
            status: EntryStatus::Processing,
            converted_amount: None,
        };

        self.record(ledger, entry.points_cost, record.clone())?;
        tracing::info!(
            "Redeemed '{}' for {} points ({} left)",
            entry.name,
            entry.points_cost,
            ledger.total_points()
        );
        Ok(RedeemOutcome::Redeemed(record))
    }

    /// Convert points at the configured rate
    pub fn convert_default(
        &mut self,
        ledger: &mut RewardsLedger,
        points: i64,
    ) -> Result<RedeemOutcome, RewardsError> {
        self.convert(ledger, points, self.conversion_rate)
    }

    /// Convert `points` into wallet currency at `rate`
    pub fn convert(
        &mut self,
        ledger: &mut RewardsLedger,
        points: i64,
        rate: f64,
    ) -> Result<RedeemOutcome, RewardsError> {
        self.convert_at(ledger, points, rate, Utc::now())
    }

    pub fn convert_at(
        &mut self,
        ledger: &mut RewardsLedger,
        points: i64,
        rate: f64,
        at: DateTime<Utc>,
    ) -> Result<RedeemOutcome, RewardsError> {
        validate_rate(rate)?;
        if points < 1 {
            return Err(RewardsError::InvalidInput(format!(
                "conversion amount must be at least 1 point, got {points}"
            )));
        }

        let balance = ledger.total_points();
        if points > balance {
            let shortfall = points.saturating_sub(balance);
            tracing::debug!(
                "Declined conversion of {} points: balance {}, short {}",
                points,
                balance,
                shortfall
            );
            return Ok(RedeemOutcome::Declined { shortfall });
        }

        let converted = points as f64 * rate;
        if !converted.is_finite() {
            return Err(RewardsError::InvalidInput(format!(
                "converting {points} points at {rate} does not give a finite amount"
            )));
        }
        let record = HistoryEntry {
            id: format!("conversion-{}", Uuid::new_v4()),
            kind: EntryKind::Conversion,
            item: ItemSnapshot {
                name: CONVERSION_ITEM_NAME.to_string(),
                description: format!("Converted {points} points at {rate} per point"),
                points_cost: points,
                icon: CONVERSION_ICON.to_string(),
            },
            redeemed_at: at,
            status: EntryStatus::Completed,
            converted_amount: Some(converted),
        };

        self.record(ledger, points, record.clone())?;
        tracing::info!("Converted {} points into {:.2} wallet credit", points, converted);
        Ok(RedeemOutcome::Redeemed(record))
    }

    /// Wallet credit, derived from conversion entries on every call
    pub fn wallet_balance(&self) -> f64 {
        self.history
            .iter()
            .filter(|e| e.is_conversion())
            .filter_map(|e| e.converted_amount)
            .sum()
    }

    /// Debit the ledger, then prepend and persist the history entry.
    fn record(
        &mut self,
        ledger: &mut RewardsLedger,
        cost: i64,
        record: HistoryEntry,
    ) -> Result<(), RewardsError> {
        ledger.add_points(-cost)?;

        self.history.insert(0, record);
        if let Err(e) = self.history_slot.save(self.store.as_ref(), &self.history) {
            self.history.remove(0);
            if let Err(refund_err) = ledger.add_points(cost) {
                tracing::error!(
                    "History write failed and refunding {} points also failed: {}",
                    cost,
                    refund_err
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

fn validate_rate(rate: f64) -> Result<(), RewardsError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(RewardsError::InvalidInput(format!(
            "conversion rate must be a positive number, got {rate}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::catalog::default_catalog;
    use crate::storage::MemoryStore;

    fn setup(points: i64) -> (MemoryStore, RewardsLedger, RedemptionEngine) {
        let store = MemoryStore::new();
        let shared: Arc<dyn KeyValueStore> = Arc::new(store.clone());
        let mut ledger = RewardsLedger::load(Arc::clone(&shared)).unwrap();
        if points != 0 {
            ledger.add_points(points).unwrap();
        }
        let engine =
            RedemptionEngine::load(shared, default_catalog(), DEFAULT_CONVERSION_RATE).unwrap();
        (store, ledger, engine)
    }

    fn item(cost: i64) -> CatalogEntry {
        CatalogEntry {
            id: "test-item".to_string(),
            name: "Test Item".to_string(),
            description: "for tests".to_string(),
            points_cost: cost,
            icon: "gift".to_string(),
            badge: None,
        }
    }

    #[test]
    fn test_declined_redeem_reports_shortfall() {
        let (_, mut ledger, mut engine) = setup(150);
        let outcome = engine.redeem(&mut ledger, &item(200)).unwrap();
        assert_eq!(outcome, RedeemOutcome::Declined { shortfall: 50 });
        assert_eq!(ledger.total_points(), 150);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_redeem_exact_balance() {
        let (_, mut ledger, mut engine) = setup(100);
        let outcome = engine.redeem(&mut ledger, &item(100)).unwrap();
        assert!(outcome.is_redeemed());
        assert_eq!(ledger.total_points(), 0);
    }

    #[test]
    fn test_redeem_by_id_unknown_item() {
        let (_, mut ledger, mut engine) = setup(1000);
        let err = engine.redeem_by_id(&mut ledger, "moon-rock").unwrap_err();
        assert!(matches!(err, RewardsError::UnknownItem(id) if id == "moon-rock"));
        assert_eq!(ledger.total_points(), 1000);
    }

    #[test]
    fn test_redeem_entry_id_uses_catalog_id_and_timestamp() {
        let (_, mut ledger, mut engine) = setup(500);
        let at = DateTime::from_timestamp_millis(1_710_000_000_000).unwrap();
        let outcome = engine.redeem_at(&mut ledger, &item(10), at).unwrap();
        assert_eq!(outcome.entry().unwrap().id, "test-item-1710000000000");
    }

    #[test]
    fn test_non_positive_cost_rejected() {
        let (_, mut ledger, mut engine) = setup(500);
        assert!(matches!(
            engine.redeem(&mut ledger, &item(0)),
            Err(RewardsError::InvalidInput(_))
        ));
        assert_eq!(ledger.total_points(), 500);
    }

    #[test]
    fn test_convert_declined_and_invalid() {
        let (_, mut ledger, mut engine) = setup(100);
        let outcome = engine.convert(&mut ledger, 150, 0.5).unwrap();
        assert_eq!(outcome.shortfall(), Some(50));

        assert!(matches!(
            engine.convert(&mut ledger, 0, 0.5),
            Err(RewardsError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.convert(&mut ledger, 10, f64::NAN),
            Err(RewardsError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.convert(&mut ledger, 10, -1.0),
            Err(RewardsError::InvalidInput(_))
        ));
        assert_eq!(ledger.total_points(), 100);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_convert_default_uses_configured_rate() {
        let (_, mut ledger, mut engine) = setup(40);
        let outcome = engine.convert_default(&mut ledger, 40).unwrap();
        assert_eq!(outcome.entry().unwrap().converted_amount, Some(20.0));
        assert_eq!(ledger.total_points(), 0);
    }

    #[test]
    fn test_wallet_ignores_redemptions() {
        let (_, mut ledger, mut engine) = setup(1000);
        engine.convert(&mut ledger, 100, 0.5).unwrap();
        engine.redeem_by_id(&mut ledger, "canteen-voucher").unwrap();
        engine.convert(&mut ledger, 10, 2.0).unwrap();
        assert_eq!(engine.history().len(), 3);
        assert!((engine.wallet_balance() - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_history_write_failure_refunds_points() {
        let (store, mut ledger, mut engine) = setup(500);
        // Leave room for the balance to change but not for a history entry
        let used: usize = [keys::POINTS, keys::BADGES]
            .iter()
            .flat_map(|k| [k.to_string(), crate::storage::revision_key(k)])
            .filter_map(|k| store.get(&k).unwrap().map(|v| k.len() + v.len()))
            .sum();
        store.set_quota(Some(used + 16)).unwrap();

        let err = engine.redeem(&mut ledger, &item(100)).unwrap_err();
        assert!(matches!(err, RewardsError::Storage(_)));
        assert_eq!(ledger.total_points(), 500);
        assert!(engine.history().is_empty());
        assert_eq!(store.get(keys::POINTS).unwrap(), Some(b"500".to_vec()));
    }

    #[test]
    fn test_conversion_to_infinite_amount_is_rejected() {
        let (store, mut ledger, mut engine) = setup(10);
        let err = engine.convert(&mut ledger, 10, 1e308).unwrap_err();
        assert!(matches!(err, RewardsError::InvalidInput(_)));
        assert_eq!(ledger.total_points(), 10);
        assert!(engine.history().is_empty());
        assert_eq!(store.get(keys::HISTORY).unwrap(), None);
    }

    #[test]
    fn test_shortfall_saturates_on_extreme_negative_balance() {
        let (_, mut ledger, mut engine) = setup(0);
        ledger.add_points(i64::MIN).unwrap();

        let outcome = engine.redeem(&mut ledger, &item(1)).unwrap();
        assert_eq!(outcome, RedeemOutcome::Declined { shortfall: i64::MAX });

        let outcome = engine.convert(&mut ledger, 5, 0.5).unwrap();
        assert_eq!(outcome.shortfall(), Some(i64::MAX));
        assert_eq!(ledger.total_points(), i64::MIN);
        assert!(engine.history().is_empty());
    }
}
