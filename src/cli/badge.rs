//! Badge command implementation

use anyhow::Result;

use campus_rewards::rewards::{icons, Reward, RewardsError, RewardsService};

use super::{retry_on_conflict, Context};

pub fn badge_command(ctx: &Context, name: &str, description: &str, icon: &str) -> Result<()> {
    let (_config, mut service) = ctx.open_service()?;

    match retry_on_conflict(&mut service, |s| award_once(s, name, description, icon))? {
        Some(reward) => {
            println!("✓ {} {} [{}]", icons::glyph(&reward.icon), reward.name, reward.id);
        }
        None => println!("Already earned: {}", name.trim()),
    }
    Ok(())
}

/// Add the badge unless one with the same name is already held
fn award_once(
    service: &mut RewardsService,
    name: &str,
    description: &str,
    icon: &str,
) -> Result<Option<Reward>, RewardsError> {
    if service.ledger().has_reward_named(name.trim()) {
        return Ok(None);
    }
    service
        .ledger_mut()
        .add_reward(name, description, icon)
        .map(Some)
}
