//! `/choosefaction`: pick the Legion's faction once

use super::{CommandError, CommandResult, Commands, Invocation};
use crate::ledger::Faction;
use crate::state_machine::render::faction_selected_view;
use crate::state_machine::FACTION_ACTION_PREFIX;
use crate::view::Reply;

pub async fn run(commands: &Commands, invocation: &Invocation) -> CommandResult {
    let user_id = invocation.actor_id.as_str();

    let profile = commands.ledger.find_profile(user_id).await?.ok_or_else(|| {
        CommandError::precondition("Please begin your Legion by using the `/start` command first!")
    })?;
    if profile.faction.is_some() {
        return Err(CommandError::precondition("You have already chosen your faction!"));
    }

    // Without an explicit choice, open a menu only the invoker can answer
    let Some(choice) = invocation.option("faction") else {
        let (session_id, view) = commands.sessions.start_faction_menu(user_id).await;
        return Ok(Reply::session(view, session_id));
    };
    let choice = choice.strip_prefix(FACTION_ACTION_PREFIX).unwrap_or(choice);
    let faction = Faction::parse(choice)
        .ok_or_else(|| CommandError::precondition(format!("Unknown faction: {choice}")))?;

    commands.ledger.set_faction(user_id, faction).await?;
    tracing::info!(user_id = %user_id, faction = faction.display_name(), "Faction chosen");

    Ok(Reply::embed(faction_selected_view(faction)))
}
