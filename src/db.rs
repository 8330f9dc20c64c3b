//! SQLite-backed ledger
//!
//! Provides persistence for profiles, resource counters and inventories.

mod schema;

use schema::SCHEMA;

use crate::catalog::Building;
use crate::ledger::{
    Faction, Inventory, Ledger, LedgerError, LedgerResult, OwnedBuilding, Profile, Resources,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
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

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for LedgerError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Sqlite(e) => LedgerError::Store(e.to_string()),
            DbError::ProfileNotFound(id) => LedgerError::ProfileNotFound(id),
            DbError::ProfileExists(id) => LedgerError::ProfileExists(id),
            DbError::AlreadyOwned(name) => LedgerError::AlreadyOwned(name),
            DbError::Insufficient {
                resource,
                have,
                need,
            } => LedgerError::Insufficient {
                resource,
                have,
                need,
            },
        }
    }
}

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn();
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Profile Operations ====================

    pub fn get_profile(&self, user_id: &str) -> DbResult<Option<Profile>> {
        let conn = self.conn();
        read_profile(&conn, user_id)
    }

    pub fn create_profile(&self, profile: &Profile) -> DbResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE user_id = ?1)",
            params![profile.user_id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(DbError::ProfileExists(profile.user_id.clone()));
        }

        tx.execute(
            "INSERT INTO profiles (user_id, exp, premium_until, battles, wins, tutorial_done, faction, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                profile.user_id,
                profile.exp,
                profile.premium_until,
                profile.battles,
                profile.wins,
                profile.tutorial_done,
                profile.faction.map(Faction::key),
                Utc::now().to_rfc3339(),
            ],
        )?;
        for (resource, amount) in profile.resources.iter() {
            tx.execute(
                "INSERT INTO resources (user_id, resource, amount) VALUES (?1, ?2, ?3)",
                params![profile.user_id, resource, amount],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn update_faction(&self, user_id: &str, faction: Faction) -> DbResult<()> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE profiles SET faction = ?1 WHERE user_id = ?2",
            params![faction.key(), user_id],
        )?;
        if updated == 0 {
            return Err(DbError::ProfileNotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Apply per-resource deltas. Each statement is atomic; the batch is not
    /// wrapped in a transaction, matching the ledger primitive contract.
    pub fn increment_resources(&self, user_id: &str, deltas: &[(String, i64)]) -> DbResult<()> {
        let conn = self.conn();
        if !profile_exists(&conn, user_id)? {
            return Err(DbError::ProfileNotFound(user_id.to_string()));
        }
        for (resource, delta) in deltas {
            add_resource(&conn, user_id, resource, *delta)?;
        }
        Ok(())
    }

    // ==================== Inventory Operations ====================

    pub fn get_inventory(&self, user_id: &str) -> DbResult<Option<Inventory>> {
        let conn = self.conn();
        read_inventory(&conn, user_id)
    }

    pub fn create_inventory(&self, inventory: &Inventory) -> DbResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        ensure_inventory(&tx, &inventory.user_id)?;
        for building in &inventory.buildings {
            insert_building(&tx, &inventory.user_id, building)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn add_building(&self, user_id: &str, building: &OwnedBuilding) -> DbResult<()> {
        let conn = self.conn();
        ensure_inventory(&conn, user_id)?;
        insert_building(&conn, user_id, building)
    }

    /// Spend requirements and record the building in one transaction
    pub fn construct(&self, user_id: &str, building: &Building) -> DbResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let profile = read_profile(&tx, user_id)?
            .ok_or_else(|| DbError::ProfileNotFound(user_id.to_string()))?;
        if let Some((resource, have, need)) = profile.resources.shortfall(building) {
            return Err(DbError::Insufficient {
                resource: resource.to_string(),
                have,
                need,
            });
        }

        for req in &building.requirements {
            add_resource(&tx, user_id, &req.resource, -req.amount)?;
        }
        ensure_inventory(&tx, user_id)?;
        insert_building(
            &tx,
            user_id,
            &OwnedBuilding {
                id: building.id,
                name: building.name.clone(),
            },
        )?;

        tx.commit()?;
        Ok(())
    }

    // ==================== Counters ====================

    pub fn bump_counter(&self, name: &str) -> DbResult<i64> {
        let conn = self.conn();
        let value = conn.query_row(
            "INSERT INTO counters (name, value) VALUES (?1, 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1
             RETURNING value",
            params![name],
            |row| row.get(0),
        )?;
        Ok(value)
    }
}

fn profile_exists(conn: &Connection, user_id: &str) -> DbResult<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM profiles WHERE user_id = ?1)",
        params![user_id],
        |row| row.get(0),
    )?)
}

fn read_profile(conn: &Connection, user_id: &str) -> DbResult<Option<Profile>> {
    let row = conn
        .query_row(
            "SELECT user_id, exp, premium_until, battles, wins, tutorial_done, faction
             FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                let faction: Option<String> = row.get(6)?;
                Ok(Profile {
                    user_id: row.get(0)?,
                    exp: row.get(1)?,
                    premium_until: row.get(2)?,
                    battles: row.get(3)?,
                    wins: row.get(4)?,
                    tutorial_done: row.get(5)?,
                    faction: faction.as_deref().and_then(Faction::parse),
                    resources: Resources::default(),
                })
            },
        )
        .optional()?;

    let Some(mut profile) = row else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT resource, amount FROM resources WHERE user_id = ?1")?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (resource, amount) = row?;
        profile.resources.set(&resource, amount);
    }

    Ok(Some(profile))
}

fn read_inventory(conn: &Connection, user_id: &str) -> DbResult<Option<Inventory>> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM inventories WHERE user_id = ?1)",
        params![user_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        "SELECT building_id, name FROM inventory_buildings
         WHERE user_id = ?1 ORDER BY acquired_at, rowid",
    )?;
    let buildings = stmt
        .query_map(params![user_id], |row| {
            Ok(OwnedBuilding {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Inventory {
        user_id: user_id.to_string(),
        buildings,
    }))
}

fn add_resource(conn: &Connection, user_id: &str, resource: &str, delta: i64) -> DbResult<()> {
    conn.execute(
        "INSERT INTO resources (user_id, resource, amount) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, resource) DO UPDATE SET amount = amount + excluded.amount",
        params![user_id, resource.to_lowercase(), delta],
    )?;
    Ok(())
}

fn ensure_inventory(conn: &Connection, user_id: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO inventories (user_id, created_at) VALUES (?1, ?2)",
        params![user_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn insert_building(conn: &Connection, user_id: &str, building: &OwnedBuilding) -> DbResult<()> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO inventory_buildings (user_id, building_id, name, acquired_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, building.id, building.name, Utc::now().to_rfc3339()],
    )?;
    if inserted == 0 {
        return Err(DbError::AlreadyOwned(building.name.clone()));
    }
    Ok(())
}

#[async_trait]
impl Ledger for Database {
    async fn find_profile(&self, user_id: &str) -> LedgerResult<Option<Profile>> {
        Ok(self.get_profile(user_id)?)
    }

    async fn insert_profile(&self, profile: &Profile) -> LedgerResult<()> {
        Ok(self.create_profile(profile)?)
    }

    async fn set_faction(&self, user_id: &str, faction: Faction) -> LedgerResult<()> {
        Ok(self.update_faction(user_id, faction)?)
    }

    async fn find_inventory(&self, user_id: &str) -> LedgerResult<Option<Inventory>> {
        Ok(self.get_inventory(user_id)?)
    }

    async fn insert_inventory(&self, inventory: &Inventory) -> LedgerResult<()> {
        Ok(self.create_inventory(inventory)?)
    }

    async fn increment(&self, user_id: &str, deltas: &[(String, i64)]) -> LedgerResult<()> {
        Ok(self.increment_resources(user_id, deltas)?)
    }

    async fn push_building(&self, user_id: &str, building: &OwnedBuilding) -> LedgerResult<()> {
        Ok(self.add_building(user_id, building)?)
    }

    async fn increment_counter(&self, name: &str) -> LedgerResult<i64> {
        Ok(self.bump_counter(name)?)
    }

    async fn commit_construction(&self, user_id: &str, building: &Building) -> LedgerResult<()> {
        Ok(self.construct(user_id, building)?)
    }
}
