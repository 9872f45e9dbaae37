//! # Checkout Rules
//!
//! Pure rules applied while a sale is being committed: form validation of the
//! submitted request, cumulative stock checks, line pricing and totals.
//!
//! ## Checkout Flow
//! ```text
//! SaleRequest
//!     │ validate_sale_request      (FormErrors, re-render the form)
//!     ▼
//! ensure_sellable_cart             (EmptyCart / CartTooLarge)
//!     │
//!     ▼
//! for each line, in order:
//!     StockTally::reserve          (UndefinedStock / InsufficientStock)
//!     price_line                   (AmountOverflow)
//!     │
//!     ▼
//! SaleTotals::compute              (DiscountExceedsSubtotal / AmountOverflow)
//!     │
//!     ▼
//! change_due                       (InsufficientTender)
//! ```
//!
//! The database layer calls these in the same order while holding the write
//! lock, so the stock seen by [`StockTally`] is the committed stock.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, FormErrors};
use crate::money::Money;
use crate::types::{Product, SaleRequest};
use crate::validation::{
    validate_customer_name, validate_discount_cents, validate_quantity, validate_tendered_cents,
    validate_uuid,
};
use crate::MAX_SALE_LINES;

// =============================================================================
// Request Validation
// =============================================================================

/// Validates the submitted sale form and returns a normalized copy.
///
/// Every bad field is reported. Line errors are keyed `items[N].field` with
/// `N` starting at 1. An empty line list is not a form error; it is rejected
/// later as [`CoreError::EmptyCart`] once the shift has been checked.
pub fn validate_sale_request(request: &SaleRequest) -> Result<SaleRequest, FormErrors> {
    let mut errors = FormErrors::default();

    errors.check(validate_uuid("shift_id", &request.shift_id));
    let customer_name = errors
        .check(validate_customer_name(request.customer_name.as_deref()))
        .flatten();
    errors.check(validate_discount_cents(request.discount_cents));
    if let Some(tendered) = request.tendered_cents {
        errors.check(validate_tendered_cents(tendered));
    }

    for (idx, line) in request.line_items.iter().enumerate() {
        let prefix = format!("items[{}]", idx + 1);
        if let Err(e) = validate_uuid("product_id", &line.product_id) {
            errors.push_nested(&prefix, e);
        }
        if let Err(e) = validate_quantity(line.quantity) {
            errors.push_nested(&prefix, e);
        }
    }

    errors.into_result(SaleRequest {
        customer_name,
        ..request.clone()
    })
}

/// Rejects carts with no lines or with more than [`MAX_SALE_LINES`].
pub fn ensure_sellable_cart<T>(lines: &[T]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    if lines.len() > MAX_SALE_LINES {
        return Err(CoreError::CartTooLarge {
            max: MAX_SALE_LINES,
        });
    }
    Ok(())
}

// =============================================================================
// Stock Tally
// =============================================================================

/// Running total of quantities requested per product within one sale.
///
/// A product listed on two lines is checked against its stock with the sum
/// of both quantities, so repeated lines can never drive stock negative.
///
/// ```rust
/// use chrono::Utc;
/// use mostrador_core::checkout::StockTally;
/// use mostrador_core::{CoreError, Product};
///
/// let now = Utc::now();
/// let product = Product {
///     id: "p1".into(), name: "Azucar".into(), price_cents: 800,
///     stock: Some(4), stock_minimum: 1, created_at: now, updated_at: now,
/// };
///
/// let mut tally = StockTally::default();
/// assert!(tally.reserve(&product, 3).is_ok());
/// let err = tally.reserve(&product, 2).unwrap_err();
/// assert!(matches!(err, CoreError::InsufficientStock { available: 4, requested: 5, .. }));
/// ```
#[derive(Debug, Default)]
pub struct StockTally {
    requested: HashMap<String, i64>,
}

impl StockTally {
    /// Adds `quantity` of `product` to the tally and checks it against the
    /// product's stock.
    ///
    /// On error the tally is left unchanged.
    pub fn reserve(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        let available = product.stock.ok_or_else(|| CoreError::UndefinedStock {
            product_id: product.id.clone(),
            name: product.name.clone(),
        })?;

        let already = self.requested.get(&product.id).copied().unwrap_or(0);
        let requested = already + quantity;

        if requested > available {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
                available,
                requested,
            });
        }

        self.requested.insert(product.id.clone(), requested);
        Ok(())
    }

    #[cfg(test)]
    fn reserved(&self, product_id: &str) -> i64 {
        self.requested.get(product_id).copied().unwrap_or(0)
    }
}

// =============================================================================
// Pricing and Totals
// =============================================================================

/// Subtotal of one line at the product's current price.
pub fn price_line(product: &Product, quantity: i64) -> CoreResult<Money> {
    product
        .price()
        .checked_mul(quantity)
        .ok_or(CoreError::AmountOverflow)
}

/// Subtotal, discount and total of one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Sums the line subtotals and applies the discount.
    ///
    /// A discount larger than the subtotal is rejected so that a committed
    /// total is never negative.
    pub fn compute<I>(line_subtotals: I, discount: Money) -> CoreResult<SaleTotals>
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal = line_subtotals
            .into_iter()
            .try_fold(Money::zero(), Money::checked_add)
            .ok_or(CoreError::AmountOverflow)?;

        if discount > subtotal {
            return Err(CoreError::DiscountExceedsSubtotal {
                discount_cents: discount.cents(),
                subtotal_cents: subtotal.cents(),
            });
        }

        Ok(SaleTotals {
            subtotal,
            discount,
            total: subtotal - discount,
        })
    }
}

/// Change owed to the customer.
///
/// Without a tendered amount the sale is treated as paid exactly.
pub fn change_due(total: Money, tendered: Option<Money>) -> CoreResult<Money> {
    match tendered {
        None => Ok(Money::zero()),
        Some(tendered) if tendered < total => Err(CoreError::InsufficientTender {
            tendered_cents: tendered.cents(),
            total_cents: total.cents(),
        }),
        Some(tendered) => tendered
            .checked_sub(total)
            .ok_or(CoreError::AmountOverflow),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
