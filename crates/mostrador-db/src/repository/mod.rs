//! # Repository Module
//!
//! Database repository implementations for the back-office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service / command                                                      │
//! │       │                                                                 │
//! │       │  db.products().low_stock()           pool-bound method         │
//! │       │  SaleRepository::insert_sale(&mut tx) transaction-scoped fn    │
//! │       ▼                                                                 │
//! │  Repository  ── SQL lives here and nowhere else                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads and single-statement maintenance are methods on the repository
//! (they use the pool). Steps of a larger unit of work are associated
//! functions taking `&mut SqliteConnection`, so the caller decides which
//! transaction they join.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and stock alerts
//! - [`SaleRepository`](sale::SaleRepository) - Sales and line items
//! - [`RegisterRepository`](register::RegisterRepository) - Register sessions and shifts
//! - [`EmployeeRepository`](employee::EmployeeRepository) - Employee profiles
//! - [`IdentityRepository`](identity::IdentityRepository) - External auth identities

pub mod employee;
pub mod identity;
pub mod product;
pub mod register;
pub mod sale;
