//! # fastca-core: Pure Domain Logic for FastCa
//!
//! FastCa tracks rectangular work items ("squares") and, per item, a list of
//! dimensional measurements (length × width × count → area). This crate holds
//! the domain model with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         FastCa Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 UI collaborator (out of scope)                  │   │
//! │  │          Item list screen ──► Item detail screen               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ observable state                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            apps/fastca (start-up, shared state adapter)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fastca-core (THIS CRATE) ★                      │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                   │   │
//! │  │   │   types   │  │   error   │  │ validation│                   │   │
//! │  │   │   Item    │  │ CoreError │  │  parsing  │                   │   │
//! │  │   │Measurement│  │           │  │  checks   │                   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                   │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 fastca-db (Database Layer)                      │   │
//! │  │          SQLite, migrations, DAOs, live queries                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use fastca_core::{Item, Measurement};
//!
//! let item = Item::new();
//! let mut m = Measurement::new(&item.id);
//! m.length = 1000.0;
//! m.width = 2000.0;
//! m.count = 3;
//!
//! // 1000 mm × 2000 mm × 3 = 6 m²
//! assert!((m.area() - 6.0).abs() < 1e-9);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Square millimetres per square metre.
///
/// Dimensions are stored in millimetres; area is reported in m².
pub const MM2_PER_M2: f64 = 1_000_000.0;

/// Count assigned to a freshly created measurement.
pub const DEFAULT_COUNT: i64 = 1;
