//! Views rendered for each session state

use super::event::FACTION_ACTION_PREFIX;
use super::SessionContext;
use crate::ledger::Faction;
use crate::view::{
    capitalize, Button, ButtonStyle, View, COLOR_ERROR, COLOR_FACTION, COLOR_INFO, COLOR_SUCCESS,
    COLOR_WARN,
};

/// Catalog page at `cursor`, requirements checked against the snapshot
pub fn building_page(ctx: &SessionContext, cursor: usize) -> View {
    let Some(building) = ctx.catalog.get(cursor) else {
        return View::new("No buildings available", "", COLOR_ERROR);
    };

    let mut view = View::new(
        format!("Building: {}", building.name),
        building.description.clone(),
        COLOR_INFO,
    );

    for req in &building.requirements {
        let met = ctx.snapshot.get(&req.resource) >= req.amount;
        let status = if met { "✅" } else { "❌" };
        let emoji = ctx.emojis.get(&req.resource);
        let name = if emoji.is_empty() {
            capitalize(&req.resource)
        } else {
            format!("{} {emoji}", capitalize(&req.resource))
        };
        view = view.field(name, format!("{}  {status}", req.amount));
    }

    view.footer(format!("Building {}/{}", cursor + 1, ctx.page_count()))
        .button(Button::new("prev", "◀️", ButtonStyle::Success).disabled_if(cursor == 0))
        .button(Button::new("construct", "Construct", ButtonStyle::Danger))
        .button(
            Button::new("next", "▶️", ButtonStyle::Success).disabled_if(cursor >= ctx.last_page()),
        )
}

pub fn confirm_view(building: &str) -> View {
    View::new(
        "Confirm Construction",
        format!("Are you sure you want to construct **{building}**?"),
        COLOR_WARN,
    )
    .button(Button::new("confirm", "Yes", ButtonStyle::Success))
    .button(Button::new("cancel", "No", ButtonStyle::Danger))
}

pub fn complete_view(building: &str) -> View {
    View::new(
        "Construction Complete",
        format!("Successfully constructed **{building}**!"),
        COLOR_SUCCESS,
    )
}

pub fn cancelled_view() -> View {
    View::new("Construction Cancelled", "Interaction cancelled.", COLOR_ERROR)
}

/// Shown when the ledger refuses a commit that passed the snapshot checks
pub fn commit_failed_view(building: &str, reason: &str) -> View {
    View::new(
        "Construction Failed",
        format!("Could not construct **{building}**: {reason}"),
        COLOR_ERROR,
    )
}

/// The three factions with their perks, one button each
pub fn faction_menu_view() -> View {
    let lines: Vec<String> = Faction::ALL
        .iter()
        .map(|f| format!("{} - {}", f.display_name(), f.perk()))
        .collect();
    let styles = [ButtonStyle::Primary, ButtonStyle::Success, ButtonStyle::Danger];

    Faction::ALL.iter().zip(styles).fold(
        View::new(
            "Choose Your Faction",
            format!("Choose from the below factions:\n\n{}", lines.join("\n")),
            COLOR_FACTION,
        ),
        |view, (faction, style)| {
            view.button(Button::new(
                format!("{FACTION_ACTION_PREFIX}{}", faction.key()),
                faction.display_name(),
                style,
            ))
        },
    )
}

pub fn faction_selected_view(faction: Faction) -> View {
    View::new(
        "Faction Selected",
        format!(
            "You have joined the **{}**! Let's do the next step.",
            faction.display_name()
        ),
        COLOR_SUCCESS,
    )
}

pub fn faction_failed_view(reason: &str) -> View {
    View::new("Faction Not Selected", reason, COLOR_ERROR)
}
