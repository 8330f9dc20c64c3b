//! `/profile`: show the Legion's counters

use super::{CommandError, CommandResult, Commands, Invocation};
use crate::catalog::Emojis;
use crate::config::PROFILE_COOLDOWN;
use crate::cooldown::CooldownStatus;
use crate::ledger::Profile;
use crate::view::{Reply, View, COLOR_INFO, COLOR_PREMIUM};

/// Resources shown on the profile, in display order
const SHOWN: [(&str, &str); 5] = [
    ("Gold", "gold"),
    ("Intel", "intel"),
    ("Oil", "oil"),
    ("Steel", "steel"),
    ("Food", "food"),
];

pub async fn run(commands: &Commands, invocation: &Invocation) -> CommandResult {
    let user_id = invocation.actor_id.as_str();

    if let CooldownStatus::Active { remaining_secs } =
        commands.cooldowns.profile.check_and_arm(user_id, PROFILE_COOLDOWN)
    {
        return Err(CommandError::precondition(format!(
            "You need to wait {remaining_secs}s to use it again."
        )));
    }

    let profile = commands.ledger.find_profile(user_id).await?.ok_or_else(|| {
        CommandError::precondition("Please begin your Legion by using the `/start` command first!")
    })?;
    if !profile.tutorial_done {
        return Err(CommandError::precondition(
            "Please finish your tutorial commands first!",
        ));
    }

    let now = chrono::Utc::now().timestamp();
    Ok(Reply::embed(profile_view(
        &profile,
        &invocation.display_name,
        commands.sessions.emojis(),
        now,
    )))
}

fn profile_view(profile: &Profile, display_name: &str, emojis: &Emojis, now_unix: i64) -> View {
    let premium = profile.is_premium(now_unix);
    let faction = profile.faction.map_or("None", |f| f.display_name());

    let mut view = View::new(
        format!("{display_name}'s Legion Profile"),
        format!("**Faction**: `{faction}`\n**Premium User**: `{premium}`\n"),
        if premium { COLOR_PREMIUM } else { COLOR_INFO },
    )
    .field(
        "Exp",
        format!("`{}` {}", profile.exp, emojis.get("experience")),
    );
    for (label, resource) in SHOWN {
        view = view.field(
            label,
            format!("`{}` {}", profile.resources.get(resource), emojis.get(resource)),
        );
    }
    view.footer("Made by Alphayg")
}
