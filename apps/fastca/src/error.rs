//! # Application Error Type
//!
//! Unified error type returned to the presentation collaborator.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in FastCa                                 │
//! │                                                                         │
//! │  Screen action (e.g. save measurement)                                 │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  State holder method → AppResult<T>                              │  │
//! │  │         │                                                        │  │
//! │  │  Validation Error? ─── ValidationError ─────────┐                │  │
//! │  │  Wrong owner?     ─── CoreError::OwnerMismatch ─┤                │  │
//! │  │  Store error?     ─── DbError ──────────────────┼──► AppError ──►│  │
//! │  │         │                                       │                │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "INVALID_REFERENCE", "message": "Item does not exist" }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use fastca_core::{CoreError, ValidationError};
use fastca_db::DbError;
use serde::Serialize;
use thiserror::Error;

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Error returned from application operations.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "count must be positive"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code:?}] {message}")]
pub struct AppError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Start-up cannot continue after this error.
    #[serde(skip)]
    pub fatal: bool,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    /// Write referenced a missing item
    InvalidReference,

    /// Measurement edited from another item's screen
    OwnerMismatch,

    /// Store could not be opened or migrated
    StoreUnavailable,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl AppError {
    /// Creates a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
            fatal: false,
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }

    fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

/// Converts database errors to application errors.
impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        let fatal = err.is_fatal();
        let app = match err {
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                AppError::new(ErrorCode::InvalidReference, "Item does not exist")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                AppError::new(ErrorCode::StoreUnavailable, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                AppError::new(ErrorCode::StoreUnavailable, "Database migration failed")
            }
            err @ DbError::MissingMigration { .. } => {
                tracing::error!("{}", err);
                AppError::new(ErrorCode::StoreUnavailable, err.to_string())
            }
            DbError::SchemaMismatch { table, expected, found } => {
                tracing::error!(%table, %expected, %found, "Database schema mismatch");
                AppError::new(
                    ErrorCode::StoreUnavailable,
                    format!("Unexpected schema for table {}", table),
                )
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        };

        if fatal {
            app.fatal()
        } else {
            app
        }
    }
}

/// Converts core errors to application errors.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            err @ CoreError::OwnerMismatch { .. } => {
                AppError::new(ErrorCode::OwnerMismatch, err.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let err = AppError::from(ValidationError::MustBePositive {
            field: "count".to_string(),
        });
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "count must be positive");
        assert!(json.get("fatal").is_none());
    }

    #[test]
    fn test_foreign_key_maps_to_invalid_reference() {
        let err = AppError::from(DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".to_string(),
        });
        assert_eq!(err.code, ErrorCode::InvalidReference);
        assert!(!err.fatal);
    }

    #[test]
    fn test_missing_migration_is_fatal() {
        let err = AppError::from(DbError::MissingMigration { from: 6, to: 5 });
        assert_eq!(err.code, ErrorCode::StoreUnavailable);
        assert!(err.fatal);
        assert!(err.message.contains("6"));
    }

    #[test]
    fn test_owner_mismatch() {
        let err = AppError::from(CoreError::OwnerMismatch {
            measurement_id: "m1".to_string(),
            expected: "A".to_string(),
            actual: "B".to_string(),
        });
        assert_eq!(err.code, ErrorCode::OwnerMismatch);
    }
}
