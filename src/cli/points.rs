//! Point award and repair commands

use anyhow::Result;

use super::{format_points, retry_on_conflict, Context};

pub fn award_command(ctx: &Context, points: u32) -> Result<()> {
    let (_config, mut service) = ctx.open_service()?;
    let balance = retry_on_conflict(&mut service, |s| {
        s.ledger_mut().add_points(i64::from(points))
    })?;

    println!(
        "✓ Awarded {} points (balance: {})",
        format_points(i64::from(points)),
        format_points(balance)
    );
    Ok(())
}

pub fn repair_command(ctx: &Context) -> Result<()> {
    let (_config, mut service) = ctx.open_service()?;
    let before = service.ledger().total_points();

    if retry_on_conflict(&mut service, |s| s.ledger_mut().repair_balance())? {
        println!("✓ Reset balance from {} to 0", format_points(before));
    } else {
        println!("Balance is {}, nothing to repair.", format_points(before));
    }
    Ok(())
}
