//! HTTP surface for the interaction gateway
//!
//! The gateway adapter forwards slash commands and button presses here and
//! renders the returned replies; session views are also streamed over SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::commands::Commands;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<Commands>,
}

impl AppState {
    pub fn new(commands: Commands) -> Self {
        Self {
            commands: Arc::new(commands),
        }
    }
}
