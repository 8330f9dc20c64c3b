//! `/tutorial`: list the onboarding steps

use super::{CommandError, CommandResult, Commands, Invocation};
use crate::view::{Reply, View, COLOR_INFO};

const STEPS: &str = "• Start Your Legion\n\
• Choose a Faction\n\
• Build Basic Buildings\n  \
  Oil Refinery\n  \
  Steel Foundry\n  \
  Grain Silos\n  \
  Armory\n  \
  Research Lab\n\
• Check for Timedown of Constructions\n\
• Start the work in those Buildings\n\
• Collect the outcome from those Buildings\n\
• Check your Profile\n\
• Check For Quests page";

pub async fn run(commands: &Commands, invocation: &Invocation) -> CommandResult {
    let profile = commands.ledger.find_profile(&invocation.actor_id).await?;
    if profile.is_some_and(|p| p.tutorial_done) {
        return Err(CommandError::precondition(
            "You have already finished your tutorial. Use `/help` command for more info.",
        ));
    }

    Ok(Reply::ephemeral_embed(
        View::new("Legion Tutorial", STEPS, COLOR_INFO).footer("Made by Alphayg"),
    ))
}
