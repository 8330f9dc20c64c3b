//! Database schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    exp INTEGER NOT NULL DEFAULT 0,
    premium_until INTEGER NOT NULL DEFAULT 0,
    battles INTEGER NOT NULL DEFAULT 0,
    wins INTEGER NOT NULL DEFAULT 0,
    tutorial_done BOOLEAN NOT NULL DEFAULT 0,
    faction TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resources (
    user_id TEXT NOT NULL,
    resource TEXT NOT NULL,
    amount INTEGER NOT NULL,

    PRIMARY KEY (user_id, resource),
    FOREIGN KEY (user_id) REFERENCES profiles(user_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS inventories (
    user_id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS inventory_buildings (
    user_id TEXT NOT NULL,
    building_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    acquired_at TEXT NOT NULL,

    PRIMARY KEY (user_id, building_id),
    FOREIGN KEY (user_id) REFERENCES inventories(user_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_inventory_buildings_user
    ON inventory_buildings(user_id, acquired_at);

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";
