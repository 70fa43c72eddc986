//! Play command implementation

use anyhow::Result;

use campus_rewards::rewards::{icons, GameSession, RewardEvent};

use super::{format_points, retry_on_conflict, Context};

pub fn play_command(ctx: &Context, session: &GameSession) -> Result<()> {
    let (_config, mut service) = ctx.open_service()?;
    let events = retry_on_conflict(&mut service, |s| s.play(session))?;

    println!("{} finished with score {}\n", session.game.label(), session.score);
    for event in &events {
        match event {
            RewardEvent::PointsAwarded { amount, reason } => {
                println!("  +{} points ({reason})", format_points(*amount));
            }
            RewardEvent::BadgeEarned(reward) => {
                println!("  {} New badge: {}", icons::glyph(&reward.icon), reward.name);
            }
        }
    }

    println!(
        "\nBalance: {}",
        format_points(service.ledger().total_points())
    );
    Ok(())
}
