//! # Database Error Types
//!
//! Error types for database operations and for the services built on them.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← categorized (constraint, lock wait, pool, ...)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError ← joined with business rules (CoreError)                 │
//! │       │          LockTimeout becomes RetryableConflict                  │
//! │       ▼                                                                 │
//! │  ApiError (backoffice app) ← code + message + disposition              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mostrador_core::CoreError;
use thiserror::Error;

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - A second employee profile for the same identity
    /// - A second open register at the same location
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting a product that appears on committed sales
    /// - Referencing a non-existent shift or employee
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, negative total, ...).
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    /// Waiting for SQLite's writer lock exceeded the busy timeout.
    #[error("Timed out waiting for a database lock")]
    LockTimeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Runtime SQL error.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes.
fn is_lock_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → constraint kind, or LockTimeout when BUSY
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if is_lock_code(db_err.code().as_deref()) || msg.contains("database is locked") {
                    DbError::LockTimeout
                } else if msg.contains("UNIQUE constraint failed") {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Service Error
// =============================================================================

/// Errors returned by the services (sale processor, register manager,
/// employee directory).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule rejected the operation. Nothing was persisted.
    #[error(transparent)]
    Rule(#[from] CoreError),

    /// The database failed. Nothing was persisted.
    #[error(transparent)]
    Db(DbError),

    /// A row lock could not be acquired in time; the caller may retry.
    #[error("The records are busy; please try again")]
    RetryableConflict,
}

impl ServiceError {
    /// The business rule behind this error, if any.
    pub fn rule(&self) -> Option<&CoreError> {
        match self {
            ServiceError::Rule(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::RetryableConflict)
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::LockTimeout => ServiceError::RetryableConflict,
            DbError::NotFound { entity, id } => ServiceError::Rule(CoreError::NotFound { entity, id }),
            other => ServiceError::Db(other),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<mostrador_core::FormErrors> for ServiceError {
    fn from(err: mostrador_core::FormErrors) -> Self {
        ServiceError::Rule(CoreError::Form(err))
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_codes() {
        assert!(is_lock_code(Some("5")));
        assert!(is_lock_code(Some("517")));
        assert!(is_lock_code(Some("6")));
        assert!(!is_lock_code(Some("19")));
        assert!(!is_lock_code(None));
    }

    #[test]
    fn test_lock_timeout_is_retryable() {
        let err: ServiceError = DbError::LockTimeout.into();
        assert!(err.is_retryable());

        let err: ServiceError = DbError::PoolExhausted.into();
        assert!(matches!(err, ServiceError::Db(DbError::PoolExhausted)));
    }

    #[test]
    fn test_missing_rows_become_not_found_rule() {
        let err: ServiceError = DbError::not_found("Sale", "s-1").into();
        assert!(matches!(
            err.rule(),
            Some(CoreError::NotFound { entity, id }) if entity == "Sale" && id == "s-1"
        ));
    }

    #[test]
    fn test_rule_passthrough() {
        let err: ServiceError = CoreError::EmptyCart.into();
        assert!(matches!(err.rule(), Some(CoreError::EmptyCart)));
        assert_eq!(err.to_string(), "Sale has no line items");
    }
}
