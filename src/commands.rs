//! Command handlers
//!
//! Each command reads the invoking subject's records, checks preconditions
//! and answers with a [`Reply`]. Precondition failures are ordinary replies;
//! store failures and panics are logged and answered generically.

mod build;
mod faction;
mod ping;
mod profile;
mod start;
mod tutorial;

use crate::cooldown::Cooldowns;
use crate::ledger::{Ledger, LedgerError};
use crate::runtime::SessionManager;
use crate::view::{Reply, GENERIC_ERROR};
use futures::FutureExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;


/// Who invoked a command and with which options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Invocation {
    pub actor_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Invocation {
    pub fn new(actor_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            display_name: display_name.into(),
            options: HashMap::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// Shown to the invoker as-is
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl CommandError {
    pub fn precondition(message: impl Into<String>) -> Self {
        CommandError::Precondition(message.into())
    }
}

pub type CommandResult = Result<Reply, CommandError>;

/// Known commands, by name or alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    ChooseFaction,
    Profile,
    Tutorial,
    Build,
    Ping,
}

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('/').to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "choosefaction" | "cf" => Some(Command::ChooseFaction),
            "profile" | "pr" => Some(Command::Profile),
            "tutorial" | "tut" => Some(Command::Tutorial),
            "build" => Some(Command::Build),
            "ping" => Some(Command::Ping),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::ChooseFaction => "choosefaction",
            Command::Profile => "profile",
            Command::Tutorial => "tutorial",
            Command::Build => "build",
            Command::Ping => "ping",
        }
    }
}

/// Shared state every command handler runs against
pub struct Commands {
    ledger: Arc<dyn Ledger>,
    sessions: Arc<SessionManager>,
    cooldowns: Arc<Cooldowns>,
}

impl Commands {
    pub fn new(sessions: Arc<SessionManager>, cooldowns: Arc<Cooldowns>) -> Self {
        Self {
            ledger: sessions.ledger().clone(),
            sessions,
            cooldowns,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Run a command. Never fails: every error becomes a reply.
    pub async fn run(&self, command: Command, invocation: &Invocation) -> Reply {
        let outcome = AssertUnwindSafe(self.execute(command, invocation))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(CommandError::Precondition(message))) => Reply::ephemeral(message),
            Ok(Err(CommandError::Ledger(e))) => {
                tracing::error!(
                    command = command.name(),
                    user_id = %invocation.actor_id,
                    error = %e,
                    "Command failed"
                );
                Reply::ephemeral(GENERIC_ERROR)
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                tracing::error!(
                    command = command.name(),
                    user_id = %invocation.actor_id,
                    panic = %detail,
                    "Command panicked"
                );
                Reply::ephemeral(GENERIC_ERROR)
            }
        }
    }

    async fn execute(&self, command: Command, invocation: &Invocation) -> CommandResult {
        match command {
            Command::Start => start::run(self, invocation).await,
            Command::ChooseFaction => faction::run(self, invocation).await,
            Command::Profile => profile::run(self, invocation).await,
            Command::Tutorial => tutorial::run(self, invocation).await,
            Command::Build => build::run(self, invocation).await,
            Command::Ping => ping::run(self, invocation).await,
        }
    }
}
