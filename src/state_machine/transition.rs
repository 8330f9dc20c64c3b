//! Pure state transition function
//!
//! Given the same state, context and event, `transition` always produces the
//! same result and performs no I/O. Ledger writes and message edits are
//! returned as effects for the runtime to execute.

use super::render::{
    building_page, cancelled_view, commit_failed_view, complete_view, confirm_view,
    faction_failed_view, faction_menu_view, faction_selected_view,
};
use super::{Direction, Effect, Event, SessionContext, SessionState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Rejections. The display text is shown to the actor as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("You already constructed {0}!")]
    AlreadyOwned(String),
    #[error("You don't meet the requirements to build this!")]
    InsufficientResources {
        building: String,
        resource: String,
        have: i64,
        need: i64,
    },
    #[error("This interaction is no longer available.")]
    InvalidState {
        state: &'static str,
        event: &'static str,
    },
    #[error("No buildings available")]
    NoBuilding,
}

/// Initial state and first render of a new session
pub fn start(context: &SessionContext) -> TransitionResult {
    let state = SessionState::Browsing { cursor: 0 };
    TransitionResult::new(state).with_effect(Effect::render(building_page(context, 0)))
}

/// Initial state and render of a faction menu
pub fn start_faction_menu() -> TransitionResult {
    TransitionResult::new(SessionState::ChoosingFaction)
        .with_effect(Effect::render(faction_menu_view()))
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Browsing
        // ============================================================

        // Clamped paging; a move past either end changes nothing
        (SessionState::Browsing { cursor }, Event::Navigate { direction }) => {
            let target = match direction {
                Direction::Prev => cursor.saturating_sub(1),
                Direction::Next => (cursor + 1).min(context.last_page()),
            };
            if target == *cursor {
                return Ok(TransitionResult::new(state.clone()));
            }
            Ok(TransitionResult::new(SessionState::Browsing { cursor: target })
                .with_effect(Effect::render(building_page(context, target))))
        }

        (SessionState::Browsing { cursor }, Event::Construct) => {
            let building = context
                .catalog
                .get(*cursor)
                .ok_or(TransitionError::NoBuilding)?;

            if context.owned.contains(&building.id) {
                return Err(TransitionError::AlreadyOwned(building.name.clone()));
            }
            if let Some((resource, have, need)) = context.snapshot.shortfall(building) {
                return Err(TransitionError::InsufficientResources {
                    building: building.name.clone(),
                    resource: resource.to_string(),
                    have,
                    need,
                });
            }

            Ok(TransitionResult::new(SessionState::ConfirmPending {
                cursor: *cursor,
                building: building.name.clone(),
            })
            .with_effect(Effect::render(confirm_view(&building.name))))
        }

        (SessionState::Browsing { cursor }, Event::Timeout) => {
            Ok(TransitionResult::new(SessionState::Expired)
                .with_effect(Effect::render(building_page(context, *cursor).timed_out()))
                .with_effect(Effect::Close))
        }

        // ============================================================
        // Confirmation
        // ============================================================

        (SessionState::ConfirmPending { building, .. }, Event::Confirm) => {
            let item = context
                .catalog
                .by_name(building)
                .ok_or(TransitionError::NoBuilding)?;

            Ok(TransitionResult::new(SessionState::Committing {
                building: building.clone(),
            })
            .with_effect(Effect::CommitConstruction {
                building: item.clone(),
            }))
        }

        (SessionState::ConfirmPending { .. }, Event::Cancel) => {
            Ok(TransitionResult::new(SessionState::Cancelled)
                .with_effect(Effect::render(cancelled_view()))
                .with_effect(Effect::Close))
        }

        (SessionState::ConfirmPending { building, .. }, Event::Timeout) => {
            Ok(TransitionResult::new(SessionState::Expired)
                .with_effect(Effect::render(confirm_view(building).timed_out()))
                .with_effect(Effect::Close))
        }

        // ============================================================
        // Ledger outcome; only the write decides success
        // ============================================================
        (SessionState::Committing { building }, Event::WriteSucceeded) => {
            Ok(TransitionResult::new(SessionState::Committed {
                building: building.clone(),
            })
            .with_effect(Effect::render(complete_view(building)))
            .with_effect(Effect::Close))
        }

        (SessionState::Committing { building }, Event::WriteFailed { reason }) => {
            Ok(TransitionResult::new(SessionState::Failed {
                reason: reason.clone(),
            })
            .with_effect(Effect::render(commit_failed_view(building, &reason)))
            .with_effect(Effect::Close))
        }

        // ============================================================
        // Faction menu
        // ============================================================
        (SessionState::ChoosingFaction, Event::ChooseFaction { faction }) => {
            Ok(TransitionResult::new(SessionState::SettingFaction { faction })
                .with_effect(Effect::SetFaction { faction }))
        }

        (SessionState::ChoosingFaction, Event::Timeout) => {
            Ok(TransitionResult::new(SessionState::Expired)
                .with_effect(Effect::render(faction_menu_view().timed_out()))
                .with_effect(Effect::Close))
        }

        (SessionState::SettingFaction { faction }, Event::WriteSucceeded) => {
            Ok(TransitionResult::new(SessionState::FactionChosen { faction: *faction })
                .with_effect(Effect::render(faction_selected_view(*faction)))
                .with_effect(Effect::Close))
        }

        (SessionState::SettingFaction { .. }, Event::WriteFailed { reason }) => {
            Ok(TransitionResult::new(SessionState::Failed {
                reason: reason.clone(),
            })
            .with_effect(Effect::render(faction_failed_view(&reason)))
            .with_effect(Effect::Close))
        }

        // ============================================================
        // Everything else, including any event on a terminal state
        // ============================================================
        (state, event) => Err(TransitionError::InvalidState {
            state: state.name(),
            event: event.name(),
        }),
    }
}
