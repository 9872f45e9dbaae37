//! # mostrador-core: Pure Business Logic for Mostrador
//!
//! This crate holds the business rules of the back-office as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mostrador Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation (apps/backoffice, external UI)        │   │
//! │  │    open_register, create_sale, edit_profile, stock dashboard    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               mostrador-db (services + repositories)            │   │
//! │  │        SaleProcessor, RegisterManager, EmployeeDirectory        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ mostrador-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌────────┐ │   │
//! │  │   │  types  │ │  money  │ │ checkout │ │validation│ │ perms  │ │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, RegisterSession, Shift, Employee)
//! - [`money`] - Money type with integer arithmetic
//! - [`checkout`] - Stock checks, line pricing and sale totals
//! - [`permissions`] - Who may edit or deactivate whom
//! - [`validation`] - Field validators and form error accumulation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mostrador_core::checkout::SaleTotals;
//! use mostrador_core::money::Money;
//!
//! // Three units at $10.00 with a $5.00 discount
//! let line = Money::from_cents(1000).checked_mul(3).unwrap();
//! let totals = SaleTotals::compute([line], Money::from_cents(500)).unwrap();
//!
//! assert_eq!(totals.total.cents(), 2500);
//! ```

pub mod checkout;
pub mod error;
pub mod money;
pub mod permissions;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, FormErrors, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single sale.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single line item.
///
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum unit price in cents (100 million whole units).
///
/// At this price a full sale of [`MAX_SALE_LINES`] lines of
/// [`MAX_ITEM_QUANTITY`] units each still fits in an `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Number of products shown in the "most critical" stock list.
pub const CRITICAL_STOCK_LIMIT: u32 = 5;
