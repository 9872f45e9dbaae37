//! # Domain Types
//!
//! Core domain types used throughout Mostrador.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐  owns  ┌─────────────────┐  refs  ┌─────────────┐ │
//! │  │ RegisterSession │───────►│      Shift      │───────►│  Employee   │ │
//! │  │  (caja)         │        │  (turno)        │        │             │ │
//! │  │  location       │        │  opened_at      │        │  user_id ───┼─┼─► AuthIdentity
//! │  │  state          │        │  closed_at?     │        └─────────────┘ │
//! │  └─────────────────┘        └────────┬────────┘                        │
//! │                                      │ refs                            │
//! │                             ┌────────▼────────┐  owns  ┌─────────────┐ │
//! │                             │      Sale       │───────►│SaleLineItem │ │
//! │                             │  (venta)        │        │  quantity   │ │
//! │                             │  total_cents    │        │  subtotal   │ │
//! │                             └─────────────────┘        └──────┬──────┘ │
//! │                                                               │ refs   │
//! │                                                        ┌──────▼──────┐ │
//! │                                                        │   Product   │ │
//! │                                                        │ stock (opt) │ │
//! │                                                        │ stock_min   │ │
//! │                                                        └─────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ids are UUID v4 strings, except the external branch id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product with its stock level and reorder threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Units on hand. `None` means stock is not tracked and the product
    /// cannot be sold until it is defined.
    pub stock: Option<i64>,

    /// Reorder threshold.
    pub stock_minimum: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True when stock is defined and at or below the reorder threshold.
    pub fn needs_restock(&self) -> bool {
        matches!(self.stock, Some(stock) if stock <= self.stock_minimum)
    }

    /// Classifies the stock level for alerts and the dashboard.
    pub fn stock_status(&self) -> StockStatus {
        match self.stock {
            None => StockStatus::Untracked,
            Some(0) => StockStatus::OutOfStock,
            Some(stock) if stock <= self.stock_minimum => StockStatus::Low,
            Some(_) => StockStatus::Normal,
        }
    }
}

/// Stock classification of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// Stock is not defined.
    Untracked,
    /// Stock is exactly zero.
    OutOfStock,
    /// Stock is at or below the minimum.
    Low,
    /// Stock is above the minimum.
    Normal,
}

/// Counts shown on the stock dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub total: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    pub normal: i64,
}

/// Fields of the product create/edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub price_cents: i64,
    pub stock: Option<i64>,
    pub stock_minimum: i64,
}

// =============================================================================
// Register Session (caja) and Shift (turno)
// =============================================================================

/// Open/closed state of a register session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RegisterState {
    Open,
    Closed,
}

/// A cash register session at one location.
///
/// Transitions only Open → Closed. Opening again creates a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RegisterSession {
    pub id: String,
    pub location: String,
    /// Branch resolved from the location through [`BranchMap`].
    pub branch_id: Option<i64>,
    pub state: RegisterState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegisterSession {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == RegisterState::Open
    }
}

/// Location → branch id mapping applied when registers are opened or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchMap {
    branches: HashMap<String, i64>,
}

impl BranchMap {
    /// Builds a mapping from `(location, branch_id)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        BranchMap {
            branches: pairs
                .into_iter()
                .map(|(location, id)| (location.into(), id))
                .collect(),
        }
    }

    /// Branch for a location; unmapped locations have none.
    pub fn branch_for(&self, location: &str) -> Option<i64> {
        self.branches.get(location.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// A work period of one employee on one register session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shift {
    pub id: String,
    pub register_id: String,
    pub employee_id: String,
    pub opened_at: DateTime<Utc>,
    /// `None` while the shift is active.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Shift {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.closed_at.is_none()
    }
}

// =============================================================================
// Identities and Employees
// =============================================================================

/// An authentication identity, owned by the external auth system.
///
/// This crate only reads identities and flips their active flag; it never
/// creates credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuthIdentity {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl AuthIdentity {
    /// The acting identity, passed explicitly to every authorized operation.
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id.clone(),
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
        }
    }

    /// Display name used for a lazily created employee profile.
    pub fn display_first_name(&self) -> &str {
        if self.first_name.trim().is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// An employee profile, one-to-one with an [`AuthIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields used to create an employee profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
}

impl EmployeeProfile {
    /// Default profile derived from an identity.
    pub fn from_identity(identity: &AuthIdentity) -> Self {
        EmployeeProfile {
            first_name: identity.display_first_name().to_string(),
            last_name: identity.last_name.clone(),
            email: identity.email.clone(),
            phone: None,
            position: None,
        }
    }
}

/// Partial profile edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Staff-only field.
    pub position: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.position.is_none()
    }

    /// Applies the update to an employee in place.
    pub fn apply_to(&self, employee: &mut Employee) {
        if let Some(first_name) = &self.first_name {
            employee.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &self.last_name {
            employee.last_name = last_name.trim().to_string();
        }
        if let Some(email) = &self.email {
            employee.email = email.trim().to_string();
        }
        if let Some(phone) = &self.phone {
            employee.phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());
        }
        if let Some(position) = &self.position {
            employee.position = Some(position.trim().to_string()).filter(|p| !p.is_empty());
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Sale (venta) and Line Items (detalle de venta)
// =============================================================================

/// A committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub shift_id: String,
    pub customer_name: Option<String>,
    /// Sum of line subtotals.
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    /// `subtotal_cents - discount_cents`.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub tendered_cents: Option<i64>,
    /// Change due to the customer (vuelto).
    pub change_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// One product/quantity entry of a sale. Immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineItem {
    pub id: String,
    pub sale_id: String,
    /// Position in the submitted order, starting at 1.
    pub line_no: i64,
    pub product_id: String,
    pub quantity: i64,
    /// Product price at the time of sale.
    pub unit_price_cents: i64,
    /// `unit_price_cents * quantity`.
    pub subtotal_cents: i64,
}

impl SaleLineItem {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A requested line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// A submitted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub shift_id: String,
    pub customer_name: Option<String>,
    #[serde(default)]
    pub discount_cents: i64,
    pub payment_method: PaymentMethod,
    pub tendered_cents: Option<i64>,
    pub line_items: Vec<LineItemRequest>,
}

/// Stock movement of one product caused by a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_id: String,
    pub name: String,
    pub previous: i64,
    pub remaining: i64,
    pub stock_minimum: i64,
}

impl StockChange {
    /// True when the remaining stock is at or below the minimum.
    pub fn is_low(&self) -> bool {
        self.remaining <= self.stock_minimum
    }
}

/// Result of a committed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSale {
    pub sale: Sale,
    pub line_items: Vec<SaleLineItem>,
    /// One entry per line, in line order.
    pub stock_changes: Vec<StockChange>,
}

impl CompletedSale {
    /// Products left at or below their minimum, reported once each with the
    /// final remaining stock.
    pub fn low_stock_alerts(&self) -> Vec<&StockChange> {
        let mut alerts: Vec<&StockChange> = Vec::new();
        for change in self.stock_changes.iter().rev() {
            if alerts.iter().any(|a| a.product_id == change.product_id) {
                continue;
            }
            if change.is_low() {
                alerts.push(change);
            }
        }
        alerts.reverse();
        alerts
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: Option<i64>, minimum: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p".to_string(),
            name: "Harina 1kg".to_string(),
            price_cents: 1000,
            stock,
            stock_minimum: minimum,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(product(None, 2).stock_status(), StockStatus::Untracked);
        assert_eq!(product(Some(0), 2).stock_status(), StockStatus::OutOfStock);
        assert_eq!(product(Some(2), 2).stock_status(), StockStatus::Low);
        assert_eq!(product(Some(3), 2).stock_status(), StockStatus::Normal);
    }

    #[test]
    fn test_needs_restock_at_minimum() {
        assert!(product(Some(2), 2).needs_restock());
        assert!(!product(Some(5), 2).needs_restock());
        assert!(!product(None, 2).needs_restock());
    }

    #[test]
    fn test_branch_map_lookup() {
        let map = BranchMap::from_pairs([("Monona, zn oeste", 1), ("Monona, zn norte", 2)]);
        assert_eq!(map.branch_for("Monona, zn norte"), Some(2));
        assert_eq!(map.branch_for(" Monona, zn oeste "), Some(1));
        assert_eq!(map.branch_for("Centro"), None);
    }

    #[test]
    fn test_payment_method_parse_and_serde() {
        assert_eq!("Efectivo".parse::<PaymentMethod>(), Ok(PaymentMethod::Cash));
        assert_eq!("debit".parse::<PaymentMethod>(), Ok(PaymentMethod::Card));
        assert!("barter".parse::<PaymentMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"transfer\""
        );
    }

    #[test]
    fn test_identity_display_name_falls_back_to_username() {
        let identity = AuthIdentity {
            id: "u1".to_string(),
            username: "mgarcia".to_string(),
            first_name: " ".to_string(),
            last_name: "Garcia".to_string(),
            email: "m@example.com".to_string(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
        };
        let profile = EmployeeProfile::from_identity(&identity);
        assert_eq!(profile.first_name, "mgarcia");
        assert_eq!(profile.last_name, "Garcia");
    }

    #[test]
    fn test_low_stock_alerts_report_final_level_once() {
        let change = |remaining| StockChange {
            product_id: "p".to_string(),
            name: "Harina".to_string(),
            previous: remaining + 1,
            remaining,
            stock_minimum: 2,
        };
        let now = Utc::now();
        let completed = CompletedSale {
            sale: Sale {
                id: "s".to_string(),
                shift_id: "t".to_string(),
                customer_name: None,
                subtotal_cents: 0,
                discount_cents: 0,
                total_cents: 0,
                payment_method: PaymentMethod::Cash,
                tendered_cents: None,
                change_cents: 0,
                created_at: now,
                updated_at: now,
            },
            line_items: Vec::new(),
            stock_changes: vec![change(2), change(1)],
        };

        let alerts = completed.low_stock_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].remaining, 1);
    }
}
