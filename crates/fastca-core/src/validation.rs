//! # Validation Module
//!
//! Boundary checks for user-entered measurement values.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI collaborator                                              │
//! │  └── Raw text from input fields                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── parse_dimension / parse_count (text → number)                     │
//! │  └── validate_measurement (whole record)                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── Foreign key constraints (owner must exist)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store assumes every value it receives already passed this module.
//!
//! ## Usage
//! ```rust
//! use fastca_core::validation::{parse_count, parse_dimension};
//!
//! assert_eq!(parse_dimension("length", " 1250,5 ").unwrap(), 1250.5);
//! assert_eq!(parse_count("3").unwrap(), 3);
//! assert!(parse_count("0").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::Measurement;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a length or width in millimetres.
///
/// ## Rules
/// - Must be finite
/// - Must not be negative (zero is allowed and yields zero area)
pub fn validate_dimension(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a measurement count.
///
/// ## Rules
/// - Must be at least 1
pub fn validate_count(count: i64) -> ValidationResult<()> {
    if count < 1 {
        return Err(ValidationError::MustBePositive {
            field: "count".to_string(),
        });
    }

    Ok(())
}

/// Validates a whole measurement before it is written.
pub fn validate_measurement(measurement: &Measurement) -> ValidationResult<()> {
    if measurement.owner_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "owner_id".to_string(),
        });
    }

    validate_dimension("length", measurement.length)?;
    validate_dimension("width", measurement.width)?;
    validate_count(measurement.count)?;

    Ok(())
}

// =============================================================================
// Text Parsers
// =============================================================================

/// Parses a dimension typed by the user.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Empty text means zero
/// - A comma is accepted as the decimal separator
/// - The result must pass [`validate_dimension`]
pub fn parse_dimension(field: &str, text: &str) -> ValidationResult<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }

    let value: f64 = text
        .replace(',', ".")
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not a number", text),
        })?;

    validate_dimension(field, value)?;
    Ok(value)
}

/// Parses a count typed by the user.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must be a whole number of at least 1
pub fn parse_count(text: &str) -> ValidationResult<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::Required {
            field: "count".to_string(),
        });
    }

    let count: i64 = text.parse().map_err(|_| ValidationError::InvalidFormat {
        field: "count".to_string(),
        reason: format!("'{}' is not a whole number", text),
    })?;

    validate_count(count)?;
    Ok(count)
}

// =============================================================================
// Unit Tests
// =============================================================================
