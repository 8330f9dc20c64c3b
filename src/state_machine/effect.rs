//! Effects produced by state transitions

use crate::catalog::Building;
use crate::ledger::Faction;
use crate::view::View;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the session's message with this view
    Render { view: View },

    /// Spend the building's requirements and record it as owned. The
    /// runtime answers with `WriteSucceeded` or `WriteFailed`.
    CommitConstruction { building: Building },

    /// Record the owner's faction. Answered like `CommitConstruction`.
    SetFaction { faction: Faction },

    /// Reclaim the session's table entry
    Close,
}

impl Effect {
    pub fn render(view: View) -> Self {
        Effect::Render { view }
    }
}
