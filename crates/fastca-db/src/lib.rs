//! # fastca-db: Database Layer for FastCa
//!
//! Local SQLite persistence for items and measurements, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FastCa Data Flow                                 │
//! │                                                                         │
//! │  Screen state (apps/fastca)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     fastca-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌────────────────┐  │   │
//! │  │   │   Database    │   │ ItemRepository │   │   Migrations   │  │   │
//! │  │   │   (pool.rs)   │   │       │        │   │ user_version   │  │   │
//! │  │   │               │   │  ItemDao       │   │ 1→2→3→4→5      │  │   │
//! │  │   │ SqlitePool    │◄──│  MeasurementDao│   │ + schema check │  │   │
//! │  │   │ Invalidation  │   │       │        │   └────────────────┘  │   │
//! │  │   │ Tracker       │◄──┴── notify ────┘                         │   │
//! │  │   └───────────────┘                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SQLite file: fastca_database.db                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Versioned migration chain
//! - [`schema`] - Schema snapshots and validation
//! - [`observer`] - Table invalidation and live queries
//! - [`dao`] - Per-table data access
//! - [`repository`] - Facade used by the state layer
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fastca_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("fastca_database.db")).await?;
//! let repo = db.repository();
//!
//! let mut items = repo.all_items();
//! while let Some(snapshot) = items.next().await {
//!     println!("{} items", snapshot?.len());
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dao;
pub mod error;
pub mod migrations;
pub mod observer;
pub mod pool;
pub mod repository;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::CURRENT_VERSION;
pub use observer::{InvalidationTracker, Table};
pub use pool::{Database, DbConfig};
pub use repository::ItemRepository;

// DAO re-exports for convenience
pub use dao::item::ItemDao;
pub use dao::measurement::MeasurementDao;
