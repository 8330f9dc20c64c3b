//! `/build`: open a construction session over the catalog

use super::{CommandError, CommandResult, Commands, Invocation};
use crate::config::BUILD_COOLDOWN;
use crate::cooldown::CooldownStatus;
use crate::ledger::Inventory;
use crate::view::Reply;

pub async fn run(commands: &Commands, invocation: &Invocation) -> CommandResult {
    let user_id = invocation.actor_id.as_str();

    if let CooldownStatus::Active { remaining_secs } =
        commands.cooldowns.build.check_and_arm(user_id, BUILD_COOLDOWN)
    {
        return Err(CommandError::precondition(format!(
            "You need to wait {remaining_secs}s to use it again."
        )));
    }

    let profile = commands.ledger.find_profile(user_id).await?.ok_or_else(|| {
        CommandError::precondition("Please form a Legion by using the `/start` command first!")
    })?;

    if commands.sessions.catalog().is_empty() {
        return Err(CommandError::precondition(
            "Building data unavailable. Please try again later.",
        ));
    }

    let inventory = match commands.ledger.find_inventory(user_id).await? {
        Some(inventory) => inventory,
        None => {
            let inventory = Inventory::empty(user_id);
            commands.ledger.insert_inventory(&inventory).await?;
            inventory
        }
    };
    let owned: Vec<u32> = inventory.buildings.iter().map(|b| b.id).collect();

    let (session_id, view) = commands
        .sessions
        .start_build_session(user_id, profile.resources, owned)
        .await;
    Ok(Reply::session(view, session_id))
}
