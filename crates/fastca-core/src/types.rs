//! # Domain Types
//!
//! The two persisted record types.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   1      *   ┌──────────────────────┐             │
//! │  │      Item       │──────────────│     Measurement      │             │
//! │  │  ─────────────  │   cascade    │  ──────────────────  │             │
//! │  │  id (UUID)      │   delete     │  id (UUID)           │             │
//! │  └─────────────────┘              │  owner_id (FK)       │             │
//! │                                   │  name                │             │
//! │                                   │  length, width (mm)  │             │
//! │                                   │  count               │             │
//! │                                   │  created_at (ms)     │             │
//! │                                   │  ── area() (m²) ──   │             │
//! │                                   └──────────────────────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ownership is exclusive: a measurement cannot outlive its item. The rule is
//! enforced by the store (foreign key with `ON DELETE CASCADE`), not here.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{DEFAULT_COUNT, MM2_PER_M2};

// =============================================================================
// Item
// =============================================================================

/// A tracked unit ("square") with only an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    /// Unique identifier (UUID v4), immutable after creation.
    pub id: String,
}

impl Item {
    /// Creates an item with a freshly generated id.
    pub fn new() -> Self {
        Item {
            id: Uuid::new_v4().to_string(),
        }
    }

    /// Creates an item with a caller-supplied id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Item { id: id.into() }
    }
}

impl Default for Item {
    fn default() -> Self {
        Item::new()
    }
}

// =============================================================================
// Measurement
// =============================================================================

/// A dimensional line entry belonging to one item.
///
/// Dimensions are millimetres; `created_at` is epoch milliseconds and is the
/// only ordering key used for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Measurement {
    /// Unique identifier (UUID v4), immutable after creation.
    pub id: String,

    /// Owning item.
    pub owner_id: String,

    /// Free-text label.
    pub name: String,

    /// Length in millimetres.
    pub length: f64,

    /// Width in millimetres.
    pub width: f64,

    /// Multiplier.
    pub count: i64,

    /// Creation time, epoch milliseconds.
    pub created_at: i64,
}

impl Measurement {
    /// Creates a measurement for `owner_id` with defaulted fields.
    ///
    /// ## Defaults
    /// - empty name
    /// - zero length and width
    /// - count of 1
    /// - `created_at` set to the current time
    pub fn new(owner_id: impl Into<String>) -> Self {
        Measurement {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: String::new(),
            length: 0.0,
            width: 0.0,
            count: DEFAULT_COUNT,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Area in square metres.
    ///
    /// `length * width * count / 1_000_000`, or zero when any factor is not
    /// positive.
    pub fn area(&self) -> f64 {
        if self.length > 0.0 && self.width > 0.0 && self.count > 0 {
            self.length * self.width * self.count as f64 / MM2_PER_M2
        } else {
            0.0
        }
    }
}

/// Sum of [`Measurement::area`] over a list.
pub fn total_area(measurements: &[Measurement]) -> f64 {
    measurements.iter().map(Measurement::area).sum()
}

/// Sum of the piece counts over a list.
pub fn total_count(measurements: &[Measurement]) -> i64 {
    measurements.iter().map(|m| m.count).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(length: f64, width: f64, count: i64) -> Measurement {
        Measurement {
            length,
            width,
            count,
            ..Measurement::new("A")
        }
    }

    #[test]
    fn test_item_ids_are_unique() {
        let a = Item::new();
        let b = Item::new();
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_measurement_defaults() {
        let m = Measurement::new("owner");
        assert_eq!(m.owner_id, "owner");
        assert_eq!(m.name, "");
        assert_eq!(m.length, 0.0);
        assert_eq!(m.width, 0.0);
        assert_eq!(m.count, 1);
        assert!(m.created_at > 0);
    }

    #[test]
    fn test_area_scenario() {
        let m = measurement(1000.0, 2000.0, 3);
        assert!((m.area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_zero_when_any_factor_not_positive() {
        assert_eq!(measurement(0.0, 2000.0, 3).area(), 0.0);
        assert_eq!(measurement(1000.0, 0.0, 3).area(), 0.0);
        assert_eq!(measurement(1000.0, 2000.0, 0).area(), 0.0);
        assert_eq!(measurement(-5.0, 2000.0, 3).area(), 0.0);
        assert_eq!(measurement(1000.0, -1.0, 3).area(), 0.0);
        assert_eq!(measurement(1000.0, 2000.0, -2).area(), 0.0);
    }

    #[test]
    fn test_area_fractional_dimensions() {
        let m = measurement(1234.5, 987.6, 2);
        let expected = 1234.5 * 987.6 * 2.0 / 1_000_000.0;
        assert!((m.area() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_total_area() {
        let list = vec![
            measurement(1000.0, 1000.0, 1),
            measurement(500.0, 2000.0, 2),
            measurement(0.0, 2000.0, 2),
        ];
        assert!((total_area(&list) - 3.0).abs() < 1e-9);
        assert_eq!(total_area(&[]), 0.0);
    }

    #[test]
    fn test_total_count() {
        let list = vec![
            measurement(1000.0, 1000.0, 1),
            measurement(500.0, 2000.0, 2),
            measurement(0.0, 0.0, 3),
        ];
        assert_eq!(total_count(&list), 6);
        assert_eq!(total_count(&[]), 0);
    }

    #[test]
    fn test_measurement_serializes_snake_case_fields() {
        let m = measurement(10.0, 20.0, 1);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["owner_id"], "A");
        assert_eq!(json["count"], 1);
    }
}
