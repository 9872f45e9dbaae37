//! # Back-office Configuration
//!
//! ## Configuration Sources (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults (this file)                                                │
//! │  2. Config file                                                         │
//! │     explicit --config path, or                                          │
//! │     ~/.config/mostrador/backoffice.toml (Linux)                        │
//! │     ~/Library/Application Support/com.mostrador.backoffice/... (macOS) │
//! │  3. Environment variables (MOSTRADOR_*)                                │
//! │  4. validate()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```toml
//! [database]
//! path = "/var/lib/mostrador/mostrador.db"
//! max_connections = 5
//! lock_timeout_ms = 5000
//!
//! [store]
//! name = "Almacén Monona"
//! currency_symbol = "Bs "
//!
//! [[branches]]
//! location = "Monona, zn oeste"
//! branch_id = 1
//!
//! [[branches]]
//! location = "Monona, zn norte"
//! branch_id = 2
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mostrador_core::{BranchMap, Money};
use mostrador_db::DbConfig;

const CONFIG_FILE: &str = "backoffice.toml";
const DATABASE_FILE: &str = "mostrador.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    /// Bound on waiting for the writer lock, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
            lock_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Shown in the dashboard header.
    pub name: String,
    pub currency_symbol: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: "Mostrador".to_string(),
            currency_symbol: "$".to_string(),
        }
    }
}

/// One entry of the location → branch mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchEntry {
    pub location: String,
    pub branch_id: i64,
}

// =============================================================================
// BackofficeConfig
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackofficeConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub branches: Vec<BranchEntry>,
}

impl BackofficeConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading back-office config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(path) = &self.database.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("database.path must not be empty".into()));
            }
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.lock_timeout_ms must be greater than 0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for branch in &self.branches {
            let location = branch.location.trim();
            if location.is_empty() {
                return Err(ConfigError::Invalid("branch location must not be empty".into()));
            }
            if !seen.insert(location) {
                return Err(ConfigError::Invalid(format!(
                    "branch location listed twice: {}",
                    location
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `MOSTRADOR_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("MOSTRADOR_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("MOSTRADOR_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid MOSTRADOR_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(ms) = lookup("MOSTRADOR_LOCK_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.lock_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid MOSTRADOR_LOCK_TIMEOUT_MS"),
            }
        }

        if let Some(name) = lookup("MOSTRADOR_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(symbol) = lookup("MOSTRADOR_CURRENCY_SYMBOL") {
            self.store.currency_symbol = symbol;
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "mostrador", "backoffice")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// The configured database file, or `mostrador.db` in the platform data
    /// directory (created if missing).
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join(DATABASE_FILE))
    }

    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(self.database.max_connections)
            .lock_timeout(Duration::from_millis(self.database.lock_timeout_ms)))
    }

    pub fn branch_map(&self) -> BranchMap {
        BranchMap::from_pairs(
            self.branches
                .iter()
                .map(|b| (b.location.trim().to_string(), b.branch_id)),
        )
    }

    /// Formats an amount with the store's currency symbol.
    pub fn format_money(&self, cents: i64) -> String {
        Money::from_cents(cents).format_with(&self.store.currency_symbol)
    }
}
