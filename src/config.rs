//! Process configuration
//!
//! Everything comes from the environment; tunables that are not worth an
//! environment variable live in the `Default` impls of the component configs.

use std::path::PathBuf;
use std::time::Duration;

/// Cooldown applied to `/build`
pub const BUILD_COOLDOWN: Duration = Duration::from_secs(15);
/// Cooldown applied to `/profile`
pub const PROFILE_COOLDOWN: Duration = Duration::from_secs(15);
/// Cooldown applied to `/ping`
pub const PING_COOLDOWN: Duration = Duration::from_secs(5);

/// Top-level bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub db_path: PathBuf,
    pub port: u16,
    /// Directory holding `buildings.json` and `emojis.json`
    pub data_dir: PathBuf,
    /// Webhook receiving batched log lines. Without it logs only go to stdout.
    pub log_webhook: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Self {
        let db_path = std::env::var("FORGE_DB_PATH").map_or_else(
            |_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(format!("{home}/.forgelegion/forgelegion.db"))
            },
            PathBuf::from,
        );

        let port = std::env::var("FORGE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let data_dir = std::env::var("FORGE_DATA_DIR")
            .map_or_else(|_| PathBuf::from("data"), PathBuf::from);

        let log_webhook = std::env::var("FORGE_LOG_WEBHOOK")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            db_path,
            port,
            data_dir,
            log_webhook,
        }
    }

    pub fn buildings_path(&self) -> PathBuf {
        self.data_dir.join("buildings.json")
    }

    pub fn emojis_path(&self) -> PathBuf {
        self.data_dir.join("emojis.json")
    }
}

/// Timing for interactive sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Inactivity window while browsing the catalog
    pub browse_timeout: Duration,
    /// Window to answer a construction confirmation
    pub confirm_timeout: Duration,
    /// Window to pick from the faction menu
    pub menu_timeout: Duration,
    /// Highest number of catalog pages a session will page through
    pub page_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browse_timeout: Duration::from_secs(60),
            confirm_timeout: Duration::from_secs(10),
            menu_timeout: Duration::from_secs(30),
            page_limit: 13,
        }
    }
}
