//! Configuration loading and management

mod io;
mod settings;

pub use settings::{Settings, StorageBackend};

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::rewards::{default_catalog, icons, CatalogEntry};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,

    /// Redemption catalog. Empty means the built-in catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalog: Vec<CatalogEntry>,
}

impl Config {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = Self::from_file_raw(path)?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Create a config with sensible defaults
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// The catalog redemptions run against
    pub fn effective_catalog(&self) -> Vec<CatalogEntry> {
        if self.catalog.is_empty() {
            default_catalog()
        } else {
            self.catalog.clone()
        }
    }

    /// Check rate and catalog entries
    pub fn validate(&self) -> Result<()> {
        let rate = self.settings.conversion_rate;
        if !rate.is_finite() || rate <= 0.0 {
            bail!("settings.conversion_rate must be a positive number, got {rate}");
        }

        let mut seen = HashSet::new();
        for entry in &self.catalog {
            if entry.id.trim().is_empty() {
                bail!("catalog entry '{}' has an empty id", entry.name);
            }
            if entry.name.trim().is_empty() {
                bail!("catalog entry '{}' has an empty name", entry.id);
            }
            if entry.points_cost <= 0 {
                bail!(
                    "catalog entry '{}' must cost at least 1 point, got {}",
                    entry.id,
                    entry.points_cost
                );
            }
            if !seen.insert(entry.id.as_str()) {
                bail!("duplicate catalog id '{}'", entry.id);
            }
            if !icons::is_known(&entry.icon) {
                tracing::debug!(
                    "Catalog entry '{}' uses icon '{}' verbatim",
                    entry.id,
                    entry.icon
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::with_defaults());
        assert_eq!(config.settings.conversion_rate, 0.5);
        assert_eq!(config.settings.storage, StorageBackend::Sqlite);
        assert_eq!(config.effective_catalog(), default_catalog());
    }

    #[test]
    fn test_custom_catalog_replaces_default() {
        let config = Config::from_toml_str(
            r#"
            [settings]
            conversion_rate = 0.25
            storage = "files"

            [[catalog]]
            id = "gym-pass"
            name = "Gym Day Pass"
            description = "One day at the campus gym"
            points_cost = 120
            icon = "star"
            badge = "New"
            "#,
        )
        .unwrap();

        assert_eq!(config.settings.conversion_rate, 0.25);
        assert_eq!(config.settings.storage, StorageBackend::Files);
        let catalog = config.effective_catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].id, "gym-pass");
        assert_eq!(catalog[0].badge.as_deref(), Some("New"));
    }

    #[test]
    fn test_rejects_bad_rate() {
        let err = Config::from_toml_str("[settings]\nconversion_rate = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("conversion_rate"));
    }

    #[test]
    fn test_rejects_duplicate_and_free_items() {
        let item = |id: &str, cost: i64| {
            format!(
                "[[catalog]]\nid = \"{id}\"\nname = \"Item\"\ndescription = \"\"\npoints_cost = {cost}\nicon = \"gift\"\n"
            )
        };

        let duplicate = format!("{}{}", item("a", 10), item("a", 20));
        assert!(Config::from_toml_str(&duplicate)
            .unwrap_err()
            .to_string()
            .contains("duplicate"));

        assert!(Config::from_toml_str(&item("free", 0)).is_err());
    }
}
