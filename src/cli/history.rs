//! History command implementation

use anyhow::Result;

use campus_rewards::rewards::icons;

use super::{format_points, Context};

/// Show redemptions and conversions, newest first
pub fn history_command(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let (_config, service) = ctx.open_service()?;
    let history = service.engine().history();

    if history.is_empty() {
        println!("No redemptions yet.");
        return Ok(());
    }

    let shown = limit.unwrap_or(history.len()).min(history.len());
    println!("History ({} of {}):\n", shown, history.len());

    for entry in &history[..shown] {
        let detail = match entry.converted_amount {
            Some(amount) if entry.is_conversion() => format!(" -> {amount:.2} credit"),
            _ => String::new(),
        };
        println!(
            "  {} {} {} -{} pts [{}]{}",
            entry.redeemed_at.format("%Y-%m-%d %H:%M"),
            icons::glyph(&entry.item.icon),
            entry.item.name,
            format_points(entry.item.points_cost),
            entry.status,
            detail
        );
    }

    println!("\nWallet: {:.2}", service.wallet_balance());
    Ok(())
}
