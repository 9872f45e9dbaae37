//! # Error Types
//!
//! Domain-specific error types for mostrador-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mostrador-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - One field-level input failure                  │
//! │  └── FormErrors       - Every field failure of one submitted form      │
//! │                                                                         │
//! │  mostrador-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - CoreError | DbError | RetryableConflict        │
//! │                                                                         │
//! │  backoffice errors (app)                                               │
//! │  └── ApiError         - What the caller sees (code + disposition)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every variant maps to one specific user-facing message. None of them are
/// retried automatically.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced shift does not exist or is already closed.
    #[error("No active shift: {shift_id}")]
    NoActiveShift { shift_id: String },

    /// A sale was submitted without line items.
    #[error("Sale has no line items")]
    EmptyCart,

    /// A line item references a product id that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds the stock on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line (P, qty: 5)
    ///      │
    ///      ▼
    /// Lock P, stock = 2
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: P, available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, form shows "Only 2 in stock"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The product does not track stock, so it cannot be sold.
    #[error("Stock is not defined for {name}")]
    UndefinedStock { product_id: String, name: String },

    /// A register with state Open already exists for this location.
    #[error("A register is already open at {location}; close it before opening another")]
    RegisterAlreadyOpen { location: String },

    /// Closing a register session that is already closed.
    #[error("Register {register_id} is already closed")]
    RegisterAlreadyClosed { register_id: String },

    /// The discount is larger than the sum of the line subtotals.
    #[error("Discount {discount_cents} exceeds sale subtotal {subtotal_cents}")]
    DiscountExceedsSubtotal {
        discount_cents: i64,
        subtotal_cents: i64,
    },

    /// The amount tendered does not cover the sale total.
    #[error("Amount tendered {tendered_cents} is less than total {total_cents}")]
    InsufficientTender {
        tendered_cents: i64,
        total_cents: i64,
    },

    /// A line subtotal or the sale subtotal does not fit in an `i64`.
    #[error("Sale amount is too large to record")]
    AmountOverflow,

    /// Sale has exceeded the maximum allowed lines.
    #[error("Sale cannot have more than {max} line items")]
    CartTooLarge { max: usize },

    /// The actor is not allowed to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Single field validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Whole-form validation failure.
    #[error("Invalid form: {0}")]
    Form(#[from] FormErrors),
}

impl CoreError {
    /// Creates a NotFound error for an entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a PermissionDenied error.
    pub fn denied(reason: impl Into<String>) -> Self {
        CoreError::PermissionDenied(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Form Errors
// =============================================================================

/// Accumulated field-level errors of one submitted form.
///
/// Form validators never stop at the first problem: every invalid field is
/// reported so the form can be re-rendered with all messages at once.
///
/// ```rust
/// use mostrador_core::{FormErrors, ValidationError};
///
/// let mut errors = FormErrors::default();
/// errors.push(ValidationError::Required { field: "name".into() });
/// assert_eq!(errors.for_field("name").count(), 1);
/// assert!(errors.into_result(()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    errors: Vec<ValidationError>,
}

impl FormErrors {
    /// Records a field error.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Records the error of a validator result, if any.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    /// Records a field error with its field name prefixed (e.g. `items[2].quantity`).
    pub fn push_nested(&mut self, prefix: &str, error: ValidationError) {
        let nested = |field: &str| format!("{}.{}", prefix, field);
        let error = match error {
            ValidationError::Required { field } => ValidationError::Required {
                field: nested(&field),
            },
            ValidationError::TooLong { field, max } => ValidationError::TooLong {
                field: nested(&field),
                max,
            },
            ValidationError::OutOfRange { field, min, max } => ValidationError::OutOfRange {
                field: nested(&field),
                min,
                max,
            },
            ValidationError::MustBePositive { field } => ValidationError::MustBePositive {
                field: nested(&field),
            },
            ValidationError::MustNotBeNegative { field } => ValidationError::MustNotBeNegative {
                field: nested(&field),
            },
            ValidationError::InvalidFormat { field, reason } => ValidationError::InvalidFormat {
                field: nested(&field),
                reason,
            },
        };
        self.push(error);
    }

    /// True when no field failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of field errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// All errors in the order they were found.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Errors reported for one field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.field() == field)
    }

    /// Converts into `Ok(value)` when empty, `Err(self)` otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for FormErrors {}

impl From<ValidationError> for FormErrors {
    fn from(error: ValidationError) -> Self {
        FormErrors {
            errors: vec![error],
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            name: "Yerba 1kg".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Yerba 1kg: available 2, requested 5"
        );
    }

    #[test]
    fn test_form_errors_accumulate_and_display() {
        let mut errors = FormErrors::default();
        assert!(errors.check(Ok::<_, ValidationError>(3)).is_some());
        errors.push(ValidationError::Required {
            field: "location".to_string(),
        });
        errors.push_nested(
            "items[1]",
            ValidationError::MustBePositive {
                field: "quantity".to_string(),
            },
        );

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.for_field("items[1].quantity").count(), 1);
        assert_eq!(
            errors.to_string(),
            "location is required; items[1].quantity must be positive"
        );
    }

    #[test]
    fn test_empty_form_errors_pass_value_through() {
        let errors = FormErrors::default();
        assert_eq!(errors.into_result(7).unwrap(), 7);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let form_err: CoreError = FormErrors::default().into();
        assert!(matches!(form_err, CoreError::Form(_)));
    }
}
