//! A session: context plus current state

use super::transition::{
    start, start_faction_menu, transition, TransitionError, TransitionResult,
};
use super::{Effect, Event, SessionContext, SessionState};

/// One interactive construction flow
#[derive(Debug, Clone)]
pub struct Session {
    context: SessionContext,
    state: SessionState,
}

impl Session {
    /// Create a session in `Browsing` at cursor 0 with its first render
    pub fn start(context: SessionContext) -> (Self, Vec<Effect>) {
        let result = start(&context);
        Self::from_start(context, result)
    }

    /// Create a session showing the faction menu
    pub fn start_faction_menu(context: SessionContext) -> (Self, Vec<Effect>) {
        Self::from_start(context, start_faction_menu())
    }

    fn from_start(context: SessionContext, result: TransitionResult) -> (Self, Vec<Effect>) {
        (
            Self {
                context,
                state: result.new_state,
            },
            result.effects,
        )
    }

    /// Apply an event. On rejection the state is left untouched.
    pub fn apply(&mut self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let event_name = event.name();
        let result = transition(&self.state, &self.context, event)?;
        if result.new_state != self.state {
            tracing::debug!(
                session_id = %self.context.session_id,
                from = self.state.name(),
                to = result.new_state.name(),
                event = event_name,
                "Session transition"
            );
        }
        self.state = result.new_state;
        Ok(result.effects)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn id(&self) -> &str {
        &self.context.session_id
    }

    pub fn owner_id(&self) -> &str {
        &self.context.owner_id
    }
}
