//! Construction session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod render;
mod session;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Direction, Event, FACTION_ACTION_PREFIX};
pub use session::Session;
pub use state::{SessionContext, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};
