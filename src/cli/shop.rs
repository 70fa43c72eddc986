//! Catalog, redeem and convert commands

use anyhow::Result;

use campus_rewards::rewards::{icons, RedeemOutcome};

use super::{format_points, retry_on_conflict, Context};

/// List the catalog with affordability against the current balance
pub fn catalog_command(ctx: &Context) -> Result<()> {
    let (_config, service) = ctx.open_service()?;
    let balance = service.ledger().total_points();
    let catalog = service.engine().catalog();

    if catalog.is_empty() {
        println!("The catalog is empty.");
        return Ok(());
    }

    println!("Catalog ({} items, balance {}):\n", catalog.len(), format_points(balance));
    for item in catalog {
        let mark = if balance >= item.points_cost { "✓" } else { " " };
        let promo = item
            .badge
            .as_deref()
            .map(|b| format!(" [{b}]"))
            .unwrap_or_default();
        println!(
            "  {mark} {} {:<24} {:>6} pts  {}{}",
            icons::glyph(&item.icon),
            item.id,
            format_points(item.points_cost),
            item.name,
            promo
        );
        if !item.description.is_empty() {
            println!("      {}", item.description);
        }
    }

    println!(
        "\nConversion rate: {} wallet credit per point",
        service.engine().conversion_rate()
    );
    Ok(())
}

pub fn redeem_command(ctx: &Context, item: &str) -> Result<()> {
    let (_config, mut service) = ctx.open_service()?;

    match retry_on_conflict(&mut service, |s| s.redeem(item))? {
        RedeemOutcome::Redeemed(entry) => {
            println!(
                "✓ Redeemed {} for {} points [{}]",
                entry.item.name,
                format_points(entry.item.points_cost),
                entry.status
            );
            println!(
                "  Balance: {}",
                format_points(service.ledger().total_points())
            );
        }
        RedeemOutcome::Declined { shortfall } => {
            println!("✗ Not enough points: {} more needed", format_points(shortfall));
        }
    }
    Ok(())
}

pub fn convert_command(ctx: &Context, points: i64, rate: Option<f64>) -> Result<()> {
    let (_config, mut service) = ctx.open_service()?;

    let outcome = retry_on_conflict(&mut service, |s| match rate {
        Some(rate) => s.convert_with_rate(points, rate),
        None => s.convert(points),
    })?;

    match outcome {
        RedeemOutcome::Redeemed(entry) => {
            println!(
                "✓ Converted {} points into {:.2} wallet credit",
                format_points(points),
                entry.converted_amount.unwrap_or_default()
            );
            println!(
                "  Balance: {}  Wallet: {:.2}",
                format_points(service.ledger().total_points()),
                service.wallet_balance()
            );
        }
        RedeemOutcome::Declined { shortfall } => {
            println!("✗ Not enough points: {} more needed", format_points(shortfall));
        }
    }
    Ok(())
}
