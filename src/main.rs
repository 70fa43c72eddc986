use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use campus_rewards::config::Config;
use campus_rewards::rewards::{GameKind, GameSession};

mod cli;

#[derive(Parser)]
#[command(name = "campus-rewards")]
#[command(about = "Student portal rewards - points, badges, redemptions and wallet")]
#[command(version)]
struct Cli {
    /// Directory holding rewards data (overrides settings.data_dir)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.campus-rewards/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show point balance, wallet and earned badges
    Status,

    /// Award points to the current user
    Award {
        /// Number of points to add
        points: u32,
    },

    /// Award a badge
    Badge {
        /// Badge name, e.g. "Speed Demon"
        name: String,

        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// Icon reference name (see `catalog`) or an emoji
        #[arg(short, long, default_value = "award")]
        icon: String,
    },

    /// List redeemable items
    Catalog,

    /// Redeem a catalog item
    Redeem {
        /// Catalog item id, e.g. canteen-voucher
        item: String,
    },

    /// Convert points into wallet credit
    Convert {
        /// Points to convert
        points: i64,

        /// Override the configured conversion rate
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Show redemption and conversion history
    History {
        /// Only show the most recent N entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Reset a negative point balance to zero
    Repair,

    /// Record a finished mini-game round
    Play {
        /// typing_test, word_puzzle or quiz
        game: GameKind,

        #[arg(long)]
        score: u32,

        /// Accuracy in percent (0-100)
        #[arg(long)]
        accuracy: Option<f64>,

        /// Typing speed in words per minute
        #[arg(long)]
        wpm: Option<u32>,

        /// Time taken in milliseconds
        #[arg(long)]
        duration_ms: Option<u64>,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = cli::Context {
        config_path: args.config.unwrap_or_else(Config::global_config_path),
        data_dir: args.data_dir,
    };

    match args.command {
        Some(Commands::Init { force }) => cli::init::init_command(&ctx.config_path, force)?,
        Some(Commands::Status) | None => cli::status::status_command(&ctx)?,
        Some(Commands::Award { points }) => cli::points::award_command(&ctx, points)?,
        Some(Commands::Badge {
            name,
            description,
            icon,
        }) => cli::badge::badge_command(&ctx, &name, &description, &icon)?,
        Some(Commands::Catalog) => cli::shop::catalog_command(&ctx)?,
        Some(Commands::Redeem { item }) => cli::shop::redeem_command(&ctx, &item)?,
        Some(Commands::Convert { points, rate }) => {
            cli::shop::convert_command(&ctx, points, rate)?
        }
        Some(Commands::History { limit }) => cli::history::history_command(&ctx, limit)?,
        Some(Commands::Repair) => cli::points::repair_command(&ctx)?,
        Some(Commands::Play {
            game,
            score,
            accuracy,
            wpm,
            duration_ms,
        }) => {
            let session = GameSession {
                game,
                score,
                accuracy,
                words_per_minute: wpm,
                duration_ms,
            };
            cli::play::play_command(&ctx, &session)?
        }
    }

    Ok(())
}
