//! Session state types

use crate::catalog::{Catalog, Emojis};
use crate::config::SessionConfig;
use crate::ledger::{Faction, Resources};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Construction session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Paging through the catalog
    Browsing { cursor: usize },

    /// Waiting for the owner to confirm building the selected item
    ConfirmPending {
        cursor: usize,
        /// Name of the candidate building
        building: String,
    },

    /// Confirmed; waiting for the ledger to accept the construction
    Committing { building: String },

    /// Construction recorded in the ledger (terminal)
    Committed { building: String },

    /// Faction menu shown, waiting for a pick
    ChoosingFaction,

    /// Faction picked; waiting for the ledger to record it
    SettingFaction { faction: Faction },

    /// Faction recorded in the ledger (terminal)
    FactionChosen { faction: Faction },

    /// The ledger refused or failed the pending write (terminal)
    Failed { reason: String },

    /// Owner declined the confirmation (terminal)
    Cancelled,

    /// No interaction within the timeout (terminal)
    Expired,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Browsing { cursor: 0 }
    }
}

impl SessionState {
    /// Terminal states absorb every further event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Committed { .. }
                | SessionState::FactionChosen { .. }
                | SessionState::Failed { .. }
                | SessionState::Cancelled
                | SessionState::Expired
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Browsing { .. } => "browsing",
            SessionState::ConfirmPending { .. } => "confirm_pending",
            SessionState::Committing { .. } => "committing",
            SessionState::Committed { .. } => "committed",
            SessionState::ChoosingFaction => "choosing_faction",
            SessionState::SettingFaction { .. } => "setting_faction",
            SessionState::FactionChosen { .. } => "faction_chosen",
            SessionState::Failed { .. } => "failed",
            SessionState::Cancelled => "cancelled",
            SessionState::Expired => "expired",
        }
    }

    /// How long the state may sit without interaction before expiring
    pub fn timeout(&self, config: &SessionConfig) -> Option<Duration> {
        match self {
            SessionState::Browsing { .. } => Some(config.browse_timeout),
            SessionState::ConfirmPending { .. } => Some(config.confirm_timeout),
            SessionState::ChoosingFaction => Some(config.menu_timeout),
            _ => None,
        }
    }
}

/// Immutable per-session context
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub owner_id: String,
    pub catalog: Arc<Catalog>,
    pub emojis: Arc<Emojis>,
    /// Resource counters at session start
    pub snapshot: Resources,
    /// Building ids the owner held at session start
    pub owned: HashSet<u32>,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(
        session_id: impl Into<String>,
        owner_id: impl Into<String>,
        catalog: Arc<Catalog>,
        snapshot: Resources,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            owner_id: owner_id.into(),
            catalog,
            emojis: Arc::new(Emojis::default()),
            snapshot,
            owned: HashSet::new(),
            config: SessionConfig::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_owned(mut self, owned: impl IntoIterator<Item = u32>) -> Self {
        self.owned = owned.into_iter().collect();
        self
    }

    pub fn with_emojis(mut self, emojis: Arc<Emojis>) -> Self {
        self.emojis = emojis;
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of pages a session can reach
    pub fn page_count(&self) -> usize {
        self.catalog.len().min(self.config.page_limit)
    }

    /// Highest reachable cursor
    pub fn last_page(&self) -> usize {
        self.page_count().saturating_sub(1)
    }
}
