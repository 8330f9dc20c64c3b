//! `/ping`: report response times

use super::{CommandError, CommandResult, Commands, Invocation};
use crate::config::PING_COOLDOWN;
use crate::cooldown::CooldownStatus;
use crate::view::{Reply, View, COLOR_SUCCESS};
use std::time::Instant;

pub async fn run(commands: &Commands, invocation: &Invocation) -> CommandResult {
    let started = Instant::now();

    if let CooldownStatus::Active { remaining_secs } =
        commands.cooldowns.ping.check_and_arm(&invocation.actor_id, PING_COOLDOWN)
    {
        return Err(CommandError::precondition(format!(
            "Please wait {remaining_secs} seconds before using this command again."
        )));
    }

    // One store round trip stands in for the gateway heartbeat
    let store_started = Instant::now();
    commands.ledger.find_profile(&invocation.actor_id).await?;
    let store_ms = store_started.elapsed().as_millis();
    let handler_ms = started.elapsed().as_millis();

    tracing::info!(
        user_id = %invocation.actor_id,
        handler_ms = u64::try_from(handler_ms).unwrap_or(u64::MAX),
        store_ms = u64::try_from(store_ms).unwrap_or(u64::MAX),
        "Ping command used"
    );

    Ok(Reply::embed(View::new(
        "🏓 Pong!",
        format!("API Response: `{handler_ms}ms`\nStore: `{store_ms}ms`"),
        COLOR_SUCCESS,
    )))
}
