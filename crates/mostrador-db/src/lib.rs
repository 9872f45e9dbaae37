//! # mostrador-db: Database Layer for Mostrador
//!
//! SQLite storage, the transactional stock ledger and the services that
//! commit multi-table units of work (sales, register sessions, employee
//! profiles).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mostrador Data Flow                              │
//! │                                                                         │
//! │  Backoffice command (sell, open-register, edit-employee)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   mostrador-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │    Ledger     │    │  Migrations  │  │   │
//! │  │   │               │───►│ lock + decr.  │    │  (embedded)  │  │   │
//! │  │   │ SaleProcessor │    └───────┬───────┘    └──────────────┘  │   │
//! │  │   │ RegisterMgr   │            │                               │   │
//! │  │   │ EmployeeDir   │───►┌───────┴───────┐    ┌──────────────┐  │   │
//! │  │   └───────────────┘    │ Repositories  │◄───│   Database   │  │   │
//! │  │                        │ product, sale │    │  (pool.rs)   │  │   │
//! │  │                        │ register, ... │    │ SqlitePool   │  │   │
//! │  │                        └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, writer transactions
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database and service error types
//! - [`repository`] - SQL for each table family
//! - [`ledger`] - Row-locked stock reads and decrements
//! - [`service`] - Checkout, register sessions, employee directory
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mostrador_db::{Database, DbConfig, SaleProcessor};
//!
//! let db = Database::new(DbConfig::new("mostrador.db")).await?;
//! let completed = SaleProcessor::new(db.clone()).process_sale(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use ledger::ProductLedger;
pub use pool::{Database, DbConfig};

pub use repository::employee::EmployeeRepository;
pub use repository::identity::IdentityRepository;
pub use repository::product::ProductRepository;
pub use repository::register::RegisterRepository;
pub use repository::sale::SaleRepository;

pub use service::{
    ClosedRegister, EmployeeDirectory, OpenedRegister, RegisterManager, SaleProcessor,
};
