//! Events that can occur in a session

use crate::ledger::Faction;
use serde::{Deserialize, Serialize};

/// Prefix of the faction menu's button actions; the rest is the faction key
pub const FACTION_ACTION_PREFIX: &str = "faction:";

/// Paging direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Prev,
    Next,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Owner actions
    Navigate { direction: Direction },
    Construct,
    Confirm,
    Cancel,
    ChooseFaction { faction: Faction },

    // Runtime events
    Timeout,
    /// The pending ledger write was applied
    WriteSucceeded,
    /// The pending ledger write was refused or failed; `reason` is shown as-is
    WriteFailed { reason: String },
}

impl Event {
    /// Parse a button action as sent by the surface
    pub fn from_action(action: &str) -> Option<Self> {
        if let Some(key) = action.strip_prefix(FACTION_ACTION_PREFIX) {
            return Faction::parse(key).map(|faction| Event::ChooseFaction { faction });
        }
        match action {
            "prev" => Some(Event::Navigate {
                direction: Direction::Prev,
            }),
            "next" => Some(Event::Navigate {
                direction: Direction::Next,
            }),
            "construct" => Some(Event::Construct),
            "confirm" | "yes" => Some(Event::Confirm),
            "cancel" | "no" => Some(Event::Cancel),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Navigate {
                direction: Direction::Prev,
            } => "prev",
            Event::Navigate {
                direction: Direction::Next,
            } => "next",
            Event::Construct => "construct",
            Event::Confirm => "confirm",
            Event::Cancel => "cancel",
            Event::ChooseFaction { .. } => "choose_faction",
            Event::Timeout => "timeout",
            Event::WriteSucceeded => "write_succeeded",
            Event::WriteFailed { .. } => "write_failed",
        }
    }
}
