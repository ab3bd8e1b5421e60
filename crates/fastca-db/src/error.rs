//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── fatal at start-up (MissingMigration, SchemaMismatch, ...)    │
//! │       │      → the application must not proceed                        │
//! │       │                                                                 │
//! │       └── per-write (ForeignKeyViolation, QueryFailed, ...)            │
//! │              → surfaced to the caller as a failed save                 │
//! │                                                                         │
//! │  The store never retries. There is no background retry queue.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a measurement whose owner item does not exist
    /// - Re-pointing a measurement at a missing owner
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A migration step failed and was rolled back.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// No migration path from the on-disk version to the current one.
    ///
    /// ## When This Occurs
    /// - A step is missing from the registry
    /// - The file was written by a newer build (downgrade)
    #[error("No migration path from schema version {from} to {to}")]
    MissingMigration { from: u32, to: u32 },

    /// The on-disk schema differs from the expected current schema.
    #[error("Schema mismatch in {table}: expected {expected}, found {found}")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns true for errors that must stop application start-up.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::MigrationFailed(_)
                | DbError::MissingMigration { .. }
                | DbError::SchemaMismatch { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → ForeignKeyViolation, else QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
///
/// Absent rows and id conflicts never reach this conversion: lookups use
/// `fetch_optional` and inserts resolve conflicts with `ON CONFLICT`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "FOREIGN KEY constraint failed"
                if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DbError::MissingMigration { from: 7, to: 5 }.is_fatal());
        assert!(DbError::SchemaMismatch {
            table: "items".into(),
            expected: "a".into(),
            found: "b".into(),
        }
        .is_fatal());
        assert!(!DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".into()
        }
        .is_fatal());
        assert!(!DbError::QueryFailed("no such table: x".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = DbError::MissingMigration { from: 6, to: 5 };
        assert_eq!(err.to_string(), "No migration path from schema version 6 to 5");

        let err = DbError::MigrationFailed("v1_to_v2 (to version 2): syntax error".into());
        assert_eq!(
            err.to_string(),
            "Migration failed: v1_to_v2 (to version 2): syntax error"
        );
    }

    #[test]
    fn test_sqlx_error_mapping() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(DbError::from(sqlx::Error::PoolClosed).is_fatal());
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::Internal(_)
        ));
    }
}
