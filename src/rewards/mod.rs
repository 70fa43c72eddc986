//! Rewards core: ledger, redemption engine and game awards
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  Game awards │──▶│  RewardsLedger   │◀──│  Redemption  │
//! │  (play)      │   │  badges + points │   │  Engine      │
//! └──────────────┘   └────────┬─────────┘   └──────┬───────┘
//!                             │                    │
//!                             ▼                    ▼
//!                     rewards.badges        rewards.history
//!                     rewards.points
//!                             └──── KeyValueStore ─┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&path)?);
//! let mut rewards = RewardsService::open(store, default_catalog(), 0.5)?;
//!
//! rewards.ledger_mut().add_points(150)?;
//! match rewards.redeem("canteen-voucher")? {
//!     RedeemOutcome::Redeemed(entry) => println!("Redeemed {}", entry.item.name),
//!     RedeemOutcome::Declined { shortfall } => println!("{shortfall} points short"),
//! }
//! ```

pub mod catalog;
pub mod games;
pub mod icons;
mod ledger;
mod models;
mod persist;
mod redemption;

pub use catalog::default_catalog;
pub use games::{award_game, GameKind, GameSession, RewardEvent};
pub use ledger::{slugify, RewardsLedger};
pub use models::{
    CatalogEntry, EntryKind, EntryStatus, HistoryEntry, ItemSnapshot, Reward,
    CONVERSION_ITEM_NAME,
};
pub use persist::LoadReport;
pub use redemption::{RedeemOutcome, RedemptionEngine, DEFAULT_CONVERSION_RATE};

use std::sync::Arc;

use crate::storage::{KeyValueStore, StorageError};

/// Errors from rewards operations.
///
/// Running out of points is not one of them; see [`RedeemOutcome::Declined`].
#[derive(Debug, thiserror::Error)]
pub enum RewardsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to serialize rewards state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown catalog item: '{0}'")]
    UnknownItem(String),

    #[error("'{key}' was changed by another session; reload and try again")]
    Conflict { key: String },
}

/// Ledger and redemption engine over one shared store.
///
/// Built once by the application root and passed to whatever needs it.
pub struct RewardsService {
    ledger: RewardsLedger,
    engine: RedemptionEngine,
}

impl RewardsService {
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        catalog: Vec<CatalogEntry>,
        conversion_rate: f64,
    ) -> Result<Self, RewardsError> {
        let ledger = RewardsLedger::load(Arc::clone(&store))?;
        let engine = RedemptionEngine::load(store, catalog, conversion_rate)?;
        Ok(Self { ledger, engine })
    }

    pub fn ledger(&self) -> &RewardsLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut RewardsLedger {
        &mut self.ledger
    }

    pub fn engine(&self) -> &RedemptionEngine {
        &self.engine
    }

    /// Redeem a catalog item by id
    pub fn redeem(&mut self, catalog_id: &str) -> Result<RedeemOutcome, RewardsError> {
        self.engine.redeem_by_id(&mut self.ledger, catalog_id)
    }

    /// Convert points at the configured rate
    pub fn convert(&mut self, points: i64) -> Result<RedeemOutcome, RewardsError> {
        self.engine.convert_default(&mut self.ledger, points)
    }

    /// Convert points at an explicit rate
    pub fn convert_with_rate(
        &mut self,
        points: i64,
        rate: f64,
    ) -> Result<RedeemOutcome, RewardsError> {
        self.engine.convert(&mut self.ledger, points, rate)
    }

    /// Record a finished mini-game round
    pub fn play(&mut self, session: &GameSession) -> Result<Vec<RewardEvent>, RewardsError> {
        award_game(&mut self.ledger, session)
    }

    pub fn wallet_balance(&self) -> f64 {
        self.engine.wallet_balance()
    }

    /// Re-read all state from the store
    pub fn reload(&mut self) -> Result<(), RewardsError> {
        self.ledger.reload()?;
        self.engine.reload()
    }

    /// Unreadable keys across ledger and history
    pub fn load_report(&self) -> LoadReport {
        let mut report = self.ledger.load_report().clone();
        report.merge(self.engine.load_report());
        report
    }
}
