//! # Validation Module
//!
//! Field validators and whole-form validators.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form (this module)                                           │
//! │  ├── Field validators return Result<T, ValidationError>                │
//! │  └── Form validators collect every failure into FormErrors             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Business rules (checkout, permissions)                       │
//! │  └── CoreError: stock, shifts, registers, authorization                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE and foreign key constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mostrador_core::validation::{validate_location, validate_quantity};
//!
//! assert_eq!(validate_location("  Centro ").unwrap(), "Centro");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::{FormErrors, ValidationError};
use crate::types::{EmployeeProfile, ProductForm, ProfileUpdate};
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 100;
const MAX_PRODUCT_NAME_LEN: usize = 200;
const MAX_PHONE_LEN: usize = 20;
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// String Validators
// =============================================================================

fn required_trimmed(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a product name and returns it trimmed.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    required_trimmed("name", name, MAX_PRODUCT_NAME_LEN)
}

/// Validates a register location and returns it trimmed.
pub fn validate_location(location: &str) -> ValidationResult<String> {
    required_trimmed("location", location, MAX_NAME_LEN)
}

/// Validates a person name field (first or last name).
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<String> {
    required_trimmed(field, name, MAX_NAME_LEN)
}

/// Validates an optional customer name. Blank input becomes `None`.
pub fn validate_customer_name(name: Option<&str>) -> ValidationResult<Option<String>> {
    match name.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) if name.chars().count() > MAX_NAME_LEN => Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_NAME_LEN,
        }),
        Some(name) => Ok(Some(name.to_string())),
    }
}

/// Validates an email address. An empty address is allowed.
///
/// ```rust
/// use mostrador_core::validation::validate_email;
///
/// assert!(validate_email("ana@tienda.com").is_ok());
/// assert!(validate_email("").is_ok());
/// assert!(validate_email("ana@").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(String::new());
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }

    Ok(email.to_string())
}

/// Validates a phone number: digits, spaces, `+`, `-`, parentheses.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();

    if phone.chars().count() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, +, - and parentheses".to_string(),
        });
    }

    Ok(phone.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a price in cents. Zero is allowed, up to [`MAX_PRICE_CENTS`].
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    non_negative("price", cents)?;
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a discount in cents. Zero is allowed.
pub fn validate_discount_cents(cents: i64) -> ValidationResult<()> {
    non_negative("discount", cents)
}

/// Validates an amount tendered in cents.
pub fn validate_tendered_cents(cents: i64) -> ValidationResult<()> {
    non_negative("tendered", cents)
}

/// Validates a stock level. `None` (untracked) is allowed.
pub fn validate_stock(stock: Option<i64>) -> ValidationResult<()> {
    match stock {
        Some(stock) => non_negative("stock", stock),
        None => Ok(()),
    }
}

/// Validates a reorder threshold.
pub fn validate_stock_minimum(minimum: i64) -> ValidationResult<()> {
    non_negative("stock_minimum", minimum)
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Form Validators
// =============================================================================

/// Validates the product form, returning the normalized form.
pub fn validate_product_form(form: &ProductForm) -> Result<ProductForm, FormErrors> {
    let mut errors = FormErrors::default();

    let name = errors.check(validate_product_name(&form.name));
    errors.check(validate_price_cents(form.price_cents));
    errors.check(validate_stock(form.stock));
    errors.check(validate_stock_minimum(form.stock_minimum));

    errors.into_result(ProductForm {
        name: name.unwrap_or_default(),
        ..form.clone()
    })
}

/// Validates a new employee profile.
pub fn validate_employee_profile(profile: &EmployeeProfile) -> Result<EmployeeProfile, FormErrors> {
    let mut errors = FormErrors::default();

    let first_name = errors.check(validate_person_name("first_name", &profile.first_name));
    let email = errors.check(validate_email(&profile.email));
    let phone = match &profile.phone {
        Some(phone) => errors.check(validate_phone(phone)).filter(|p| !p.is_empty()),
        None => None,
    };

    errors.into_result(EmployeeProfile {
        first_name: first_name.unwrap_or_default(),
        last_name: profile.last_name.trim().to_string(),
        email: email.unwrap_or_default(),
        phone,
        position: profile
            .position
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
    })
}

/// Validates a profile edit. Only the fields present are checked.
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), FormErrors> {
    let mut errors = FormErrors::default();

    if let Some(first_name) = &update.first_name {
        errors.check(validate_person_name("first_name", first_name));
    }
    if let Some(last_name) = &update.last_name {
        if last_name.chars().count() > MAX_NAME_LEN {
            errors.push(ValidationError::TooLong {
                field: "last_name".to_string(),
                max: MAX_NAME_LEN,
            });
        }
    }
    if let Some(email) = &update.email {
        errors.check(validate_email(email));
    }
    if let Some(phone) = &update.phone {
        errors.check(validate_phone(phone));
    }

    errors.into_result(())
}

// =============================================================================
// Unit Tests
// =============================================================================
