//! Rewards ledger: earned badges and the point balance
//!
//! Every mutation writes the full updated value back to the store before
//! returning. If that write fails the in-memory state is left as it was.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::models::Reward;
use super::persist::{LoadReport, Slot};
use super::RewardsError;
use crate::storage::{keys, KeyValueStore};

/// Owns the badge list and the point balance of the current user
pub struct RewardsLedger {
    store: Arc<dyn KeyValueStore>,
    rewards: Vec<Reward>,
    points: i64,
    rewards_slot: Slot<Vec<Reward>>,
    points_slot: Slot<i64>,
    report: LoadReport,
}

impl RewardsLedger {
    /// Restore ledger state from the store, defaulting anything missing or unreadable
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, RewardsError> {
        let mut report = LoadReport::default();
        let (rewards_slot, rewards): (_, Vec<Reward>) =
            Slot::load(keys::BADGES, store.as_ref(), &mut report)?;
        let (points_slot, points): (_, i64) =
            Slot::load(keys::POINTS, store.as_ref(), &mut report)?;

        tracing::debug!(
            "Ledger loaded: {} badges, {} points",
            rewards.len(),
            points
        );

        Ok(Self {
            store,
            rewards,
            points,
            rewards_slot,
            points_slot,
            report,
        })
    }

    /// Re-read everything from the store, discarding in-memory state.
    ///
    /// Needed after a [`RewardsError::Conflict`].
    pub fn reload(&mut self) -> Result<(), RewardsError> {
        *self = Self::load(Arc::clone(&self.store))?;
        Ok(())
    }

    /// Keys that were unreadable at the last load
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Earn a badge now
    pub fn add_reward(
        &mut self,
        name: &str,
        description: &str,
        icon: &str,
    ) -> Result<Reward, RewardsError> {
        self.add_reward_at(name, description, icon, Utc::now())
    }

    /// Earn a badge with an explicit timestamp
    pub fn add_reward_at(
        &mut self,
        name: &str,
        description: &str,
        icon: &str,
        earned_at: DateTime<Utc>,
    ) -> Result<Reward, RewardsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RewardsError::InvalidInput(
                "reward name must not be empty".to_string(),
            ));
        }

        let reward = Reward {
            id: self.unique_id(name, earned_at),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            earned_at,
        };

        self.rewards.push(reward.clone());
        if let Err(e) = self.rewards_slot.save(self.store.as_ref(), &self.rewards) {
            self.rewards.pop();
            return Err(e);
        }

        tracing::info!("Badge earned: {} ({})", reward.name, reward.id);
        Ok(reward)
    }

    /// `slug-millis`, with `-2`, `-3`, ... appended on a same-millisecond clash
    fn unique_id(&self, name: &str, at: DateTime<Utc>) -> String {
        let base = format!("{}-{}", slugify(name), at.timestamp_millis());
        if !self.has_reward(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !self.has_reward(candidate))
            .unwrap_or(base)
    }

    /// Apply a signed delta to the balance and return the new balance.
    ///
    /// The ledger does not refuse a negative result; callers spending points
    /// check the balance first (see [`super::RedemptionEngine`]).
    pub fn add_points(&mut self, delta: i64) -> Result<i64, RewardsError> {
        let new_balance = self.points.checked_add(delta).ok_or_else(|| {
            RewardsError::InvalidInput(format!(
                "adding {delta} to {} overflows the balance",
                self.points
            ))
        })?;

        self.points_slot.save(self.store.as_ref(), &new_balance)?;
        self.points = new_balance;

        if new_balance < 0 {
            tracing::warn!("Point balance is negative after delta {}: {}", delta, new_balance);
        } else {
            tracing::debug!("Points {:+} -> {}", delta, new_balance);
        }
        Ok(new_balance)
    }

    /// Reset a negative balance to zero. Returns whether anything changed.
    pub fn repair_balance(&mut self) -> Result<bool, RewardsError> {
        if self.points >= 0 {
            return Ok(false);
        }
        tracing::info!("Repairing negative balance {}", self.points);
        self.points_slot.save(self.store.as_ref(), &0)?;
        self.points = 0;
        Ok(true)
    }

    pub fn has_reward(&self, id: &str) -> bool {
        self.rewards.iter().any(|r| r.id == id)
    }

    /// Whether a badge with this display name was already earned
    pub fn has_reward_named(&self, name: &str) -> bool {
        self.rewards.iter().any(|r| r.name == name)
    }

    pub fn total_points(&self) -> i64 {
        self.points
    }

    /// Earned badges in earn order
    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }
}

/// Lowercase, alphanumeric runs joined by `-`. Names with no usable
/// characters (e.g. only emoji) slug to `reward`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "reward".to_string()
    } else {
        slug
    }
}
