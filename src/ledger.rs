//! Subject profiles, resource counters and owned buildings
//!
//! The store behind this trait is opaque to the rest of the bot; it is
//! reached through find/insert/increment/push primitives.

use crate::catalog::Building;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Store error: {0}")]
    Store(String),
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
    #[error("Profile already exists: {0}")]
    ProfileExists(String),
    #[error("Building already owned: {0}")]
    AlreadyOwned(String),
    #[error("Insufficient {resource}: have {have}, need {need}")]
    Insufficient {
        resource: String,
        have: i64,
        need: i64,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Playable factions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    NovaPact,
    SentinelOrder,
    CrimsonReign,
}

impl Faction {
    pub const ALL: [Faction; 3] = [
        Faction::NovaPact,
        Faction::SentinelOrder,
        Faction::CrimsonReign,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Faction::NovaPact => "Nova Pact",
            Faction::SentinelOrder => "Sentinel Order",
            Faction::CrimsonReign => "Crimson Reign",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Faction::NovaPact => "nova_pact",
            Faction::SentinelOrder => "sentinel_order",
            Faction::CrimsonReign => "crimson_reign",
        }
    }

    pub fn perk(self) -> &'static str {
        match self {
            Faction::NovaPact => "**15%** Attack Buff",
            Faction::SentinelOrder => "**10%** Defense Buff",
            Faction::CrimsonReign => "**5%** Both Buff",
        }
    }

    /// Accepts the key or the display name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.key() == needle || f.display_name().to_lowercase() == needle)
    }
}

/// Resource counters keyed by lowercase resource name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources(BTreeMap<String, i64>);

impl Resources {
    /// Counters for a freshly forged Legion
    pub fn starting() -> Self {
        [
            ("food", 100),
            ("steel", 1000),
            ("oil", 1000),
            ("gold", 1000),
            ("intel", 100),
        ]
        .into_iter()
        .collect()
    }

    /// Amount held; unknown resources count as zero
    pub fn get(&self, resource: &str) -> i64 {
        self.0.get(&resource.to_lowercase()).copied().unwrap_or(0)
    }

    pub fn set(&mut self, resource: &str, amount: i64) {
        self.0.insert(resource.to_lowercase(), amount);
    }

    #[cfg(test)]
    pub fn add(&mut self, resource: &str, delta: i64) {
        *self.0.entry(resource.to_lowercase()).or_insert(0) += delta;
    }

    /// True when every requirement of the building is covered
    #[cfg(test)]
    pub fn covers(&self, building: &Building) -> bool {
        self.shortfall(building).is_none()
    }

    /// First requirement the counters do not cover
    pub fn shortfall<'b>(&self, building: &'b Building) -> Option<(&'b str, i64, i64)> {
        building
            .requirements
            .iter()
            .map(|req| (req.resource.as_str(), self.get(&req.resource), req.amount))
            .find(|(_, have, need)| have < need)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Resources {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v))
                .collect(),
        )
    }
}

/// A subject's persistent Legion profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub exp: i64,
    /// Unix timestamp (seconds) until which premium is active
    pub premium_until: i64,
    pub battles: i64,
    pub wins: i64,
    pub tutorial_done: bool,
    pub faction: Option<Faction>,
    pub resources: Resources,
}

impl Profile {
    /// Starting profile: starting resources and one hour of premium
    pub fn new(user_id: impl Into<String>, now_unix: i64) -> Self {
        Self {
            user_id: user_id.into(),
            exp: 0,
            premium_until: now_unix + 3600,
            battles: 0,
            wins: 0,
            tutorial_done: false,
            faction: None,
            resources: Resources::starting(),
        }
    }

    pub fn is_premium(&self, now_unix: i64) -> bool {
        self.premium_until > now_unix
    }
}

/// A building entry in a subject's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedBuilding {
    pub id: u32,
    pub name: String,
}

/// A subject's owned buildings, append-only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub user_id: String,
    pub buildings: Vec<OwnedBuilding>,
}

impl Inventory {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            buildings: Vec::new(),
        }
    }

    pub fn owns(&self, building_id: u32) -> bool {
        self.buildings.iter().any(|b| b.id == building_id)
    }
}

/// Store primitives consumed by commands and sessions
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> LedgerResult<Option<Profile>>;

    /// Insert a new profile; fails with `ProfileExists` if one is present
    async fn insert_profile(&self, profile: &Profile) -> LedgerResult<()>;

    async fn set_faction(&self, user_id: &str, faction: Faction) -> LedgerResult<()>;

    async fn find_inventory(&self, user_id: &str) -> LedgerResult<Option<Inventory>>;

    async fn insert_inventory(&self, inventory: &Inventory) -> LedgerResult<()>;

    /// Add each delta to its counter. Each key is updated atomically on its
    /// own; the set as a whole is not.
    async fn increment(&self, user_id: &str, deltas: &[(String, i64)]) -> LedgerResult<()>;

    async fn push_building(&self, user_id: &str, building: &OwnedBuilding) -> LedgerResult<()>;

    /// Bump a global counter, returning the new value
    async fn increment_counter(&self, name: &str) -> LedgerResult<i64>;

    /// Spend the building's requirements and record it as owned.
    ///
    /// Conditional on live balances and ownership at commit time. This default
    /// composes the per-key primitives, so a failure between them can leave a
    /// partial update; stores with transactions should override it.
    async fn commit_construction(&self, user_id: &str, building: &Building) -> LedgerResult<()> {
        let profile = self
            .find_profile(user_id)
            .await?
            .ok_or_else(|| LedgerError::ProfileNotFound(user_id.to_string()))?;
        if let Some((resource, have, need)) = profile.resources.shortfall(building) {
            return Err(LedgerError::Insufficient {
                resource: resource.to_string(),
                have,
                need,
            });
        }
        if let Some(inventory) = self.find_inventory(user_id).await? {
            if inventory.owns(building.id) {
                return Err(LedgerError::AlreadyOwned(building.name.clone()));
            }
        }

        let deltas: Vec<(String, i64)> = building
            .requirements
            .iter()
            .map(|req| (req.resource.clone(), -req.amount))
            .collect();
        self.increment(user_id, &deltas).await?;
        self.push_building(
            user_id,
            &OwnedBuilding {
                id: building.id,
                name: building.name.clone(),
            },
        )
        .await
    }
}

#[async_trait]
impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    async fn find_profile(&self, user_id: &str) -> LedgerResult<Option<Profile>> {
        (**self).find_profile(user_id).await
    }

    async fn insert_profile(&self, profile: &Profile) -> LedgerResult<()> {
        (**self).insert_profile(profile).await
    }

    async fn set_faction(&self, user_id: &str, faction: Faction) -> LedgerResult<()> {
        (**self).set_faction(user_id, faction).await
    }

    async fn find_inventory(&self, user_id: &str) -> LedgerResult<Option<Inventory>> {
        (**self).find_inventory(user_id).await
    }

    async fn insert_inventory(&self, inventory: &Inventory) -> LedgerResult<()> {
        (**self).insert_inventory(inventory).await
    }

    async fn increment(&self, user_id: &str, deltas: &[(String, i64)]) -> LedgerResult<()> {
        (**self).increment(user_id, deltas).await
    }

    async fn push_building(&self, user_id: &str, building: &OwnedBuilding) -> LedgerResult<()> {
        (**self).push_building(user_id, building).await
    }

    async fn increment_counter(&self, name: &str) -> LedgerResult<i64> {
        (**self).increment_counter(name).await
    }

    async fn commit_construction(&self, user_id: &str, building: &Building) -> LedgerResult<()> {
        (**self).commit_construction(user_id, building).await
    }
}
