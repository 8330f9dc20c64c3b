//! `/start`: forge a new Legion

use super::{CommandError, CommandResult, Commands, Invocation};
use crate::ledger::{Faction, Inventory, LedgerError, Profile};
use crate::view::{Reply, View, COLOR_SUCCESS};

pub async fn run(commands: &Commands, invocation: &Invocation) -> CommandResult {
    let user_id = invocation.actor_id.as_str();

    if commands.ledger.find_profile(user_id).await?.is_some() {
        return Err(CommandError::precondition("You already forged a Legion!"));
    }

    let profile = Profile::new(user_id, chrono::Utc::now().timestamp());
    match commands.ledger.insert_profile(&profile).await {
        Ok(()) => {}
        // Lost a race with a concurrent /start from the same subject
        Err(LedgerError::ProfileExists(_)) => {
            return Err(CommandError::precondition("You already forged a Legion!"));
        }
        Err(e) => return Err(e.into()),
    }
    commands
        .ledger
        .insert_inventory(&Inventory::empty(user_id))
        .await?;
    let users = commands.ledger.increment_counter("users").await?;

    tracing::info!(
        user_id = %user_id,
        display_name = %invocation.display_name,
        users,
        "New user joined"
    );

    Ok(Reply::embed(welcome_view(&invocation.display_name)))
}

fn welcome_view(display_name: &str) -> View {
    let factions: Vec<String> = Faction::ALL
        .iter()
        .map(|f| format!("{} - {}", f.display_name(), f.perk()))
        .collect();
    View::new(
        "Legion Forge",
        format!(
            "Welcome Supreme Leader **{display_name}**, prepare your Legion...\n\
             Lets get started, choose a Faction using /choosefaction\n{}",
            factions.join("\n")
        ),
        COLOR_SUCCESS,
    )
}
