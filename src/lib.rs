//! Campus Rewards - points, badges and redemptions for the student portal
//!
//! Students earn points in the portal's mini-games, collect badges, and
//! spend points on catalog items or convert them into wallet credit.
//!
//! ## Layers
//!
//! - [`storage`]: pluggable key-value persistence (memory, files, SQLite)
//!   with per-key revisions so concurrent sessions cannot silently
//!   overwrite each other.
//! - [`rewards`]: the ledger, the redemption engine and game awards,
//!   bundled as [`rewards::RewardsService`].
//! - [`config`]: TOML settings and the redemption catalog.

pub mod config;
pub mod rewards;
pub mod storage;
