//! # Error Types
//!
//! Domain-specific error types for fastca-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fastca-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input rejected at the boundary                 │
//! │                                                                         │
//! │  fastca-db errors (separate crate)                                     │
//! │  └── DbError          - Store and migration failures                   │
//! │                                                                         │
//! │  App errors                                                            │
//! │  └── AppError         - What the UI collaborator sees (serialized)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A measurement was submitted to a screen that does not own it.
    ///
    /// ## When This Occurs
    /// - The detail screen for item `expected` receives an edit of a
    ///   measurement that belongs to item `actual`
    #[error("Measurement {measurement_id} belongs to {actual}, not {expected}")]
    OwnerMismatch {
        measurement_id: String,
        expected: String,
        actual: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Malformed user input never reaches the store: it is rejected with one of
/// these before any write is attempted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value is not a finite number.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Text could not be parsed.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
    fn test_error_messages() {
        let err = CoreError::OwnerMismatch {
            measurement_id: "m1".to_string(),
            expected: "A".to_string(),
            actual: "B".to_string(),
        };
        assert_eq!(err.to_string(), "Measurement m1 belongs to B, not A");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "count".to_string(),
        };
        assert_eq!(err.to_string(), "count must be positive");

        let err = ValidationError::Negative {
            field: "length".to_string(),
        };
        assert_eq!(err.to_string(), "length must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "owner_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
