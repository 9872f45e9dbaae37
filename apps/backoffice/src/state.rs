//! # Application State
//!
//! The database handle, the loaded configuration and the services built on
//! them. Every command takes `&AppState`.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool`, and the services only hold clones of
//! it, so one `AppState` can serve concurrent commands without locking.

use tracing::info;

use crate::config::BackofficeConfig;
use crate::error::ApiError;
use mostrador_core::{AuthIdentity, CoreError};
use mostrador_db::{Database, EmployeeDirectory, RegisterManager, SaleProcessor};

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    config: BackofficeConfig,
    sales: SaleProcessor,
    registers: RegisterManager,
    directory: EmployeeDirectory,
}

impl AppState {
    pub fn new(db: Database, config: BackofficeConfig) -> Self {
        let registers = RegisterManager::new(db.clone(), config.branch_map());
        AppState {
            sales: SaleProcessor::new(db.clone()),
            directory: EmployeeDirectory::new(db.clone()),
            registers,
            db,
            config,
        }
    }

    /// Opens the configured database (running migrations) and builds the
    /// services.
    pub async fn connect(config: BackofficeConfig) -> Result<Self, ApiError> {
        let db_config = config.db_config()?;
        info!(path = ?db_config.database_path, "Opening database");
        let db = Database::new(db_config).await?;
        Ok(AppState::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &BackofficeConfig {
        &self.config
    }

    pub fn sales(&self) -> &SaleProcessor {
        &self.sales
    }

    pub fn registers(&self) -> &RegisterManager {
        &self.registers
    }

    pub fn directory(&self) -> &EmployeeDirectory {
        &self.directory
    }

    /// The authenticated identity behind a request. Inactive identities are
    /// rejected.
    pub async fn identity(&self, username: &str) -> Result<AuthIdentity, ApiError> {
        let identity = self
            .db
            .identities()
            .get_by_username(username)
            .await?
            .ok_or_else(|| ApiError::not_found("User", username))?;

        if !identity.is_active {
            return Err(CoreError::denied(format!("user {} is inactive", username)).into());
        }

        Ok(identity)
    }
}
