//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Mostrador                              │
//! │                                                                         │
//! │  Command Function  Result<T, ApiError>                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  FormErrors / business rule ──► disposition: re_render_form            │
//! │     (InsufficientStock, NoActiveShift, RegisterAlreadyOpen, ...)       │
//! │     the caller shows the same form again with the message              │
//! │                                                                         │
//! │  PermissionDenied / NotFound ──► disposition: reject                   │
//! │     the request ends, nothing was changed                              │
//! │                                                                         │
//! │  RetryableConflict ────────────► disposition: re_render_form           │
//! │     the records were busy; submitting again may succeed                │
//! │                                                                         │
//! │  Database failure ─────────────► disposition: reject (logged)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::config::ConfigError;
use mostrador_core::{CoreError, FormErrors};
use mostrador_db::{DbError, ServiceError};

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Aceite 1L: available 2, requested 5",
///   "disposition": "re_render_form"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    pub disposition: Disposition,

    /// Field-level messages of a rejected form.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    NotFound,

    PermissionDenied,

    /// Requested quantity exceeds the stock on hand
    InsufficientStock,

    /// Any other business rule
    BusinessRule,

    /// The records were busy; retry
    Conflict,

    DatabaseError,

    ConfigError,

    Internal,
}

/// What the caller should do with the failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Show the submitted form again with the message.
    ReRenderForm,
    /// End the request.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>, disposition: Disposition) -> Self {
        ApiError {
            code,
            message: message.into(),
            disposition,
            fields: Vec::new(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
            Disposition::Reject,
        )
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::PermissionDenied, message, Disposition::Reject)
    }

    /// A business-rule failure shown on the submitted form.
    pub fn rule(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BusinessRule, message, Disposition::ReRenderForm)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message, Disposition::Reject)
    }

    pub fn is_reject(&self) -> bool {
        self.disposition == Disposition::Reject
    }
}

impl From<FormErrors> for ApiError {
    fn from(errors: FormErrors) -> Self {
        let fields = errors
            .errors()
            .iter()
            .map(|e| FieldError {
                field: e.field().to_string(),
                message: e.to_string(),
            })
            .collect();

        ApiError {
            code: ErrorCode::ValidationError,
            message: "Please correct the highlighted fields".to_string(),
            disposition: Disposition::ReRenderForm,
            fields,
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Form(errors) => errors.into(),
            CoreError::Validation(e) => {
                let mut errors = FormErrors::default();
                errors.push(e);
                errors.into()
            }
            CoreError::PermissionDenied(_) => ApiError::permission_denied(err.to_string()),
            CoreError::NotFound { ref entity, ref id } => ApiError::not_found(entity, id),
            CoreError::InsufficientStock { .. } => ApiError::new(
                ErrorCode::InsufficientStock,
                err.to_string(),
                Disposition::ReRenderForm,
            ),
            CoreError::NoActiveShift { .. }
            | CoreError::EmptyCart
            | CoreError::ProductNotFound(_)
            | CoreError::UndefinedStock { .. }
            | CoreError::RegisterAlreadyOpen { .. }
            | CoreError::RegisterAlreadyClosed { .. }
            | CoreError::DiscountExceedsSubtotal { .. }
            | CoreError::InsufficientTender { .. }
            | CoreError::AmountOverflow
            | CoreError::CartTooLarge { .. } => ApiError::rule(err.to_string()),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => ApiError::rule(format!(
                "A record with the same {} already exists",
                field
            )),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::rule("The record is referenced by other records")
            }
            DbError::CheckViolation(message) => {
                tracing::warn!("Check constraint violation: {}", message);
                ApiError::rule("The values violate a data constraint")
            }
            DbError::LockTimeout => ApiError::new(
                ErrorCode::Conflict,
                "The records are busy; please try again",
                Disposition::ReRenderForm,
            ),
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                tracing::error!(error = %err, "Database unavailable");
                ApiError::new(
                    ErrorCode::DatabaseError,
                    "Database unavailable",
                    Disposition::Reject,
                )
            }
            DbError::MigrationFailed(e) | DbError::QueryFailed(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(
                    ErrorCode::DatabaseError,
                    "Database operation failed",
                    Disposition::Reject,
                )
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rule(rule) => rule.into(),
            ServiceError::Db(db) => db.into(),
            ServiceError::RetryableConflict => ApiError::new(
                ErrorCode::Conflict,
                err.to_string(),
                Disposition::ReRenderForm,
            ),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string(), Disposition::Reject)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use mostrador_core::ValidationError;

    #[test]
    fn test_business_rules_re_render() {
        let err: ApiError = CoreError::InsufficientStock {
            product_id: "p".into(),
            name: "Aceite".into(),
            available: 2,
            requested: 5,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.disposition, Disposition::ReRenderForm);
        assert!(err.message.contains("available 2"));

        let err: ApiError = CoreError::RegisterAlreadyOpen {
            location: "Centro".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert!(!err.is_reject());
    }

    #[test]
    fn test_permission_and_not_found_reject() {
        let err: ApiError = CoreError::denied("only staff may delete sales").into();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(err.is_reject());

        let err: ApiError = ServiceError::from(DbError::not_found("Sale", "s-1")).into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(err.is_reject());
    }

    #[test]
    fn test_form_errors_keep_fields() {
        let mut errors = FormErrors::default();
        errors.push(ValidationError::Required {
            field: "name".into(),
        });
        errors.push(ValidationError::MustNotBeNegative {
            field: "price_cents".into(),
        });

        let err: ApiError = CoreError::Form(errors).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.fields.len(), 2);
        assert_eq!(err.fields[0].field, "name");
    }

    #[test]
    fn test_conflict_and_db_errors() {
        let err: ApiError = ServiceError::RetryableConflict.into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.disposition, Disposition::ReRenderForm);

        let err: ApiError = DbError::QueryFailed("syntax error near SELEC".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_serialization() {
        let err = ApiError::not_found("Register", "r-1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["disposition"], "reject");
        assert!(json.get("fields").is_none());
    }
}
