//! Init command implementation

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

/// Default configuration content for campus-rewards init
pub const DEFAULT_CONFIG: &str = r#"# Campus Rewards Configuration
# ============================
#
# Points are earned in the portal's mini-games and spent on catalog items
# or converted into wallet credit.

# ============================================================================
# SETTINGS
# ============================================================================
#
# Available options:
#   conversion_rate - Wallet credit per converted point (default: 0.5)
#   storage         - "sqlite" (rewards.db) or "files" (one file per key)
#   data_dir        - Where rewards data lives (default: next to this file)

[settings]
conversion_rate = 0.5
storage = "sqlite"
data_dir = ""

# ============================================================================
# CATALOG
# ============================================================================
#
# Leave commented out to use the built-in catalog. Defining any [[catalog]]
# entry replaces the built-in list entirely.
#
# icon is a reference name (award, book, brain, car, coins, gift, printer,
# puzzle, shopping-bag, star, target, ticket, trophy, utensils, zap) or an
# emoji used as-is. badge is an optional promo label.
#
# [[catalog]]
# id = "canteen-voucher"
# name = "Canteen Voucher"
# description = "One free meal at any campus canteen"
# points_cost = 100
# icon = "utensils"
# badge = "Popular"
"#;

/// Write the default config to `config_path`
pub fn init_command(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    std::fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    info!("Wrote default config to {}", config_path.display());

    println!("Created: {}", config_path.display());
    Ok(())
}
