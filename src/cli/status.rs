//! Status command implementation

use anyhow::Result;

use campus_rewards::rewards::icons;

use super::{format_points, Context};

/// Show balance, wallet and earned badges
pub fn status_command(ctx: &Context) -> Result<()> {
    let (_config, service) = ctx.open_service()?;
    let ledger = service.ledger();

    println!("Points: {}", format_points(ledger.total_points()));
    println!("Wallet: {:.2}", service.wallet_balance());

    if ledger.total_points() < 0 {
        println!("\n⚠ Balance is negative. Run `campus-rewards repair` to reset it.");
    }

    let rewards = ledger.rewards();
    if rewards.is_empty() {
        println!("\nNo badges yet.");
        return Ok(());
    }

    println!("\nBadges ({}):\n", rewards.len());
    for reward in rewards {
        println!(
            "  {} {} ({})",
            icons::glyph(&reward.icon),
            reward.name,
            reward.earned_at.format("%Y-%m-%d")
        );
        if !reward.description.is_empty() {
            println!("    {}", reward.description);
        }
    }

    Ok(())
}
