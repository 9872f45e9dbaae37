//! # Commands Module
//!
//! Every operation the back-office front end can invoke.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── dashboard.rs  ◄─── Stock summary and alerts
//! ├── employee.rs   ◄─── Profiles, activation
//! ├── product.rs    ◄─── Catalog CRUD
//! ├── register.rs   ◄─── Open/close registers, shifts
//! └── sale.rs       ◄─── Checkout and sale maintenance
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open_register(&state, "cajero1", "Monona, zn norte")                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  state.identity(username) ── inactive / unknown user → reject          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  service call (RegisterManager, SaleProcessor, EmployeeDirectory)       │
//! │         │                                                               │
//! │         ├── Ok  → Response { data: Dto, notices: [success, warning..] }│
//! │         └── Err → ApiError { code, message, disposition }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take the acting username explicitly; authentication itself is
//! done by whoever calls them.

pub mod dashboard;
pub mod employee;
pub mod product;
pub mod register;
pub mod sale;
