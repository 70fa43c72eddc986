//! CLI command implementations

pub mod badge;
pub mod history;
pub mod init;
pub mod play;
pub mod points;
pub mod shop;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use campus_rewards::config::Config;
use campus_rewards::rewards::{RewardsError, RewardsService};

/// Paths shared by every command
pub struct Context {
    pub config_path: PathBuf,
    /// `--data-dir` override
    pub data_dir: Option<PathBuf>,
}

impl Context {
    pub fn load_config(&self) -> Result<Config> {
        Config::load_from(&self.config_path)
    }

    /// Data lives next to the config file unless configured otherwise
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        let fallback = self
            .config_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::global_config_dir);
        config.settings.resolved_data_dir(&fallback)
    }

    /// Load config, open the store and restore rewards state
    pub fn open_service(&self) -> Result<(Config, RewardsService)> {
        let config = self.load_config()?;
        let data_dir = self.data_dir(&config);
        let store = config.settings.open_store(&data_dir)?;

        let service = RewardsService::open(
            store,
            config.effective_catalog(),
            config.settings.conversion_rate,
        )
        .context("Failed to load rewards state")?;

        let report = service.load_report();
        if !report.is_clean() {
            eprintln!(
                "⚠ Unreadable rewards data was reset to defaults: {}",
                report.corrupted.join(", ")
            );
        }

        Ok((config, service))
    }
}

/// Run `op`; if another process wrote first, reload once and retry.
pub fn retry_on_conflict<T>(
    service: &mut RewardsService,
    mut op: impl FnMut(&mut RewardsService) -> Result<T, RewardsError>,
) -> Result<T, RewardsError> {
    match op(service) {
        Err(RewardsError::Conflict { key }) => {
            tracing::warn!("'{}' changed in another session, reloading and retrying", key);
            service.reload()?;
            op(service)
        }
        other => other,
    }
}

/// `1234` -> `1,234`
pub fn format_points(points: i64) -> String {
    let digits = points.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if points < 0 {
        format!("-{out}")
    } else {
        out
    }
}
