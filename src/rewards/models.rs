//! Persisted rewards records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Item name carried by every conversion entry in the history
pub const CONVERSION_ITEM_NAME: &str = "Points Conversion";

/// Icon reference used for conversion entries
pub const CONVERSION_ICON: &str = "coins";

/// An earned badge. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Icon reference name (see [`super::icons`]) or a literal emoji
    pub icon: String,
    pub earned_at: DateTime<Utc>,
}

/// A redeemable item. Static configuration, never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub icon: String,
    /// Promotional label shown next to the item ("Popular", "Limited")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

/// Lifecycle state of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Redeemed; fulfilment happens outside this system
    Processing,
    Completed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Entries written before the kind tag existed default to this
    #[default]
    Redemption,
    Conversion,
}

/// Snapshot of the redeemed item, copied at redemption time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    /// Reference name only; resolved to a glyph when displayed
    pub icon: String,
}

impl From<&CatalogEntry> for ItemSnapshot {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            name: entry.name.clone(),
            description: entry.description.clone(),
            points_cost: entry.points_cost,
            icon: entry.icon.clone(),
        }
    }
}

/// A past redemption or conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(default)]
    pub kind: EntryKind,
    pub item: ItemSnapshot,
    pub redeemed_at: DateTime<Utc>,
    pub status: EntryStatus,
    /// Wallet amount credited; only set on conversions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_amount: Option<f64>,
}

impl HistoryEntry {
    /// Conversions are recognised by tag, or by item name for untagged entries
    pub fn is_conversion(&self) -> bool {
        self.kind == EntryKind::Conversion || self.item.name == CONVERSION_ITEM_NAME
    }
}
