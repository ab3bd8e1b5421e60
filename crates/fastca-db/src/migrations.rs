//! # Database Migrations
//!
//! Versioned schema evolution for the FastCa store.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Read PRAGMA user_version                                              │
//! │       │                                                                 │
//! │       ├── 0 (new file)?      Create current schema directly            │
//! │       ├── == CURRENT?        Nothing to do                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan(on_disk, CURRENT) over the registry                              │
//! │       │                                                                 │
//! │       ├── no path?           MissingMigration (fatal, no guessing)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  For each step: BEGIN → statements → user_version = to → COMMIT        │
//! │       │              (any failure rolls the step back)                 │
//! │       ▼                                                                 │
//! │  Validate the resulting schema against schema::expected()              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Version History
//! | step | change                                                        |
//! |------|---------------------------------------------------------------|
//! | 1→2  | `items` gains nullable `colorArgb`                            |
//! | 2→3  | `items` rebuilt with only `id` (drops `colorArgb` again)      |
//! | 3→4  | `measurements` table, FK to `items` with cascade, owner index |
//! | 4→5  | `measurements.created_at`, 0 for existing rows                |
//!
//! The colour column added in 1→2 and removed in 2→3 belonged to an abandoned
//! feature. The chain keeps both steps so that files written by any earlier
//! build still open.
//!
//! ## Adding New Migrations
//!
//! 1. Append a `Migration { from: N, to: N + 1, .. }` to [`MIGRATIONS`]
//! 2. Update [`FRESH_SCHEMA`] and `schema::expected()` to the new shape
//! 3. Bump [`CURRENT_VERSION`]
//! 4. **NEVER** modify existing steps - always add new ones

use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::error::{DbError, DbResult};

/// Schema version this build reads and writes.
pub const CURRENT_VERSION: u32 = 5;

/// One version-to-version transformation.
///
/// All statements of a step run inside one transaction together with the
/// `user_version` bump.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub from: u32,
    pub to: u32,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

/// Schema of version 1, the first released build.
pub const BASELINE_V1: &[&str] = &["CREATE TABLE items (id TEXT NOT NULL PRIMARY KEY)"];

/// Schema of a database created at [`CURRENT_VERSION`].
pub const FRESH_SCHEMA: &[&str] = &[
    "CREATE TABLE items (id TEXT NOT NULL PRIMARY KEY)",
    "CREATE TABLE measurements (
        id TEXT NOT NULL PRIMARY KEY,
        owner_id TEXT NOT NULL REFERENCES items(id) ON UPDATE NO ACTION ON DELETE CASCADE,
        name TEXT NOT NULL DEFAULT '',
        length REAL NOT NULL DEFAULT 0,
        width REAL NOT NULL DEFAULT 0,
        count INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX index_measurements_owner_id ON measurements (owner_id)",
];

/// Registered migration steps, in chronological order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        to: 2,
        name: "add_item_color",
        statements: &["ALTER TABLE items ADD COLUMN colorArgb INTEGER"],
    },
    Migration {
        from: 2,
        to: 3,
        name: "drop_item_color",
        statements: &[
            "CREATE TABLE items_new (id TEXT NOT NULL PRIMARY KEY)",
            "INSERT INTO items_new (id) SELECT id FROM items",
            "DROP TABLE items",
            "ALTER TABLE items_new RENAME TO items",
        ],
    },
    Migration {
        from: 3,
        to: 4,
        name: "create_measurements",
        statements: &[
            "CREATE TABLE IF NOT EXISTS measurements (
                id TEXT NOT NULL PRIMARY KEY,
                owner_id TEXT NOT NULL REFERENCES items(id) ON UPDATE NO ACTION ON DELETE CASCADE,
                name TEXT NOT NULL DEFAULT '',
                length REAL NOT NULL DEFAULT 0,
                width REAL NOT NULL DEFAULT 0,
                count INTEGER NOT NULL DEFAULT 1
            )",
            "CREATE INDEX IF NOT EXISTS index_measurements_owner_id ON measurements (owner_id)",
        ],
    },
    Migration {
        from: 4,
        to: 5,
        name: "add_measurement_created_at",
        statements: &["ALTER TABLE measurements ADD COLUMN created_at INTEGER NOT NULL DEFAULT 0"],
    },
];

// =============================================================================
// Migrator
// =============================================================================

/// Applies the registered migration chain to a pool.
///
/// ## Usage
/// ```rust,ignore
/// let migrator = Migrator::new();
/// let version = migrator.run(&pool).await?;
/// assert_eq!(version, CURRENT_VERSION);
/// ```
#[derive(Debug, Clone)]
pub struct Migrator {
    migrations: Vec<Migration>,
    current_version: u32,
}

impl Default for Migrator {
    fn default() -> Self {
        Migrator::new()
    }
}

impl Migrator {
    /// Creates a migrator over [`MIGRATIONS`] targeting [`CURRENT_VERSION`].
    pub fn new() -> Self {
        Migrator {
            migrations: MIGRATIONS.to_vec(),
            current_version: CURRENT_VERSION,
        }
    }

    /// Creates a migrator over a custom registry.
    pub fn with_registry(migrations: Vec<Migration>, current_version: u32) -> Self {
        Migrator {
            migrations,
            current_version,
        }
    }

    /// Target version of this migrator.
    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Registered steps.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Checks that the registry is a total order `1 → 2 → … → current`.
    ///
    /// ## Returns
    /// * `Ok(())` - Every version below the target has a single-step successor
    /// * `Err(DbError::MissingMigration)` - First gap found
    /// * `Err(DbError::MigrationFailed)` - A step does not move forward
    pub fn validate_registry(&self) -> DbResult<()> {
        for step in &self.migrations {
            if step.to <= step.from {
                return Err(DbError::MigrationFailed(format!(
                    "step {} does not move forward ({} -> {})",
                    step.name, step.from, step.to
                )));
            }
        }

        for version in 1..self.current_version {
            let next = self
                .migrations
                .iter()
                .filter(|m| m.from == version && m.to == version + 1)
                .count();
            match next {
                1 => {}
                0 => {
                    return Err(DbError::MissingMigration {
                        from: version,
                        to: version + 1,
                    })
                }
                _ => {
                    return Err(DbError::MigrationFailed(format!(
                        "more than one step registered for {} -> {}",
                        version,
                        version + 1
                    )))
                }
            }
        }

        Ok(())
    }

    /// Finds the steps leading from `from` to `to`.
    ///
    /// From each version the step reaching furthest without overshooting
    /// `to` is taken, so the plan is the shortest chain in the registry.
    ///
    /// ## Returns
    /// * `Ok(steps)` - Ordered steps (empty when `from == to`)
    /// * `Err(DbError::MissingMigration)` - No path, including downgrades
    pub fn plan(&self, from: u32, to: u32) -> DbResult<Vec<Migration>> {
        if from > to {
            return Err(DbError::MissingMigration { from, to });
        }

        let mut steps = Vec::new();
        let mut version = from;
        while version < to {
            let step = self
                .migrations
                .iter()
                .filter(|m| m.from == version && m.to <= to)
                .max_by_key(|m| m.to)
                .ok_or(DbError::MissingMigration { from, to })?;
            steps.push(*step);
            version = step.to;
        }

        Ok(steps)
    }

    /// Brings the database at `pool` to the current version.
    ///
    /// ## Returns
    /// * `Ok(version)` - Schema version after the run
    /// * `Err(DbError::MissingMigration)` - No path (fatal)
    /// * `Err(DbError::MigrationFailed)` - A step failed and was rolled back
    pub async fn run(&self, pool: &SqlitePool) -> DbResult<u32> {
        self.validate_registry()?;

        let on_disk = schema_version(pool).await?;

        if on_disk == self.current_version {
            debug!(version = on_disk, "Database is up to date");
            return Ok(on_disk);
        }

        if on_disk == 0 {
            info!(version = self.current_version, "Creating new database schema");
            apply_in_transaction(pool, "create_schema", FRESH_SCHEMA, self.current_version).await?;
            return Ok(self.current_version);
        }

        let steps = self.plan(on_disk, self.current_version).map_err(|e| {
            error!(from = on_disk, to = self.current_version, "No migration path found");
            e
        })?;

        info!(
            from = on_disk,
            to = self.current_version,
            steps = steps.len(),
            "Migrating database"
        );

        for step in steps {
            info!(from = step.from, to = step.to, migration = step.name, "Running migration");
            apply_in_transaction(pool, step.name, step.statements, step.to).await?;
        }

        info!(version = self.current_version, "All migrations applied successfully");
        Ok(self.current_version)
    }
}

/// Runs `statements` and sets `user_version` to `version` atomically.
async fn apply_in_transaction(
    pool: &SqlitePool,
    name: &str,
    statements: &[&str],
    version: u32,
) -> DbResult<()> {
    let fail = |e: sqlx::Error| {
        error!(step = name, version, error = %e, "Migration step failed, rolling back");
        DbError::MigrationFailed(format!("{} (to version {}): {}", name, version, e))
    };

    let mut tx = pool.begin().await.map_err(fail)?;

    for statement in statements {
        sqlx::query(statement).execute(&mut *tx).await.map_err(fail)?;
    }

    // PRAGMA does not accept bound parameters
    sqlx::query(&format!("PRAGMA user_version = {}", version))
        .execute(&mut *tx)
        .await
        .map_err(fail)?;

    tx.commit().await.map_err(fail)?;
    Ok(())
}

// =============================================================================
// Free Functions
// =============================================================================

/// Runs all pending migrations with the default registry.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<u32> {
    Migrator::new().run(pool).await
}

/// Reads the on-disk schema version (`PRAGMA user_version`).
pub async fn schema_version(pool: &SqlitePool) -> DbResult<u32> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    u32::try_from(version).map_err(|_| DbError::Internal(format!("invalid user_version {}", version)))
}

/// Checks if the database is behind the current schema version.
pub async fn needs_migration(pool: &SqlitePool) -> DbResult<bool> {
    Ok(schema_version(pool).await? != CURRENT_VERSION)
}

/// Creates the version 1 schema on an empty database.
///
/// Only useful for exercising the upgrade chain.
pub async fn create_baseline(pool: &SqlitePool) -> DbResult<()> {
    apply_in_transaction(pool, "baseline_v1", BASELINE_V1, 1).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn step(from: u32, to: u32) -> Migration {
        Migration {
            from,
            to,
            name: "test",
            statements: &[],
        }
    }

    #[test]
    fn test_default_registry_is_total() {
        let migrator = Migrator::new();
        assert!(migrator.validate_registry().is_ok());
        assert_eq!(migrator.migrations().len(), (CURRENT_VERSION - 1) as usize);
    }

    #[test]
    fn test_plan_full_chain() {
        let plan = Migrator::new().plan(1, CURRENT_VERSION).unwrap();
        let versions: Vec<(u32, u32)> = plan.iter().map(|m| (m.from, m.to)).collect();
        assert_eq!(versions, vec![(1, 2), (2, 3), (3, 4), (4, 5)]);
    }

    #[test]
    fn test_plan_partial_chain() {
        let plan = Migrator::new().plan(3, CURRENT_VERSION).unwrap();
        let names: Vec<&str> = plan.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["create_measurements", "add_measurement_created_at"]);

        assert!(Migrator::new().plan(5, 5).unwrap().is_empty());
    }

    #[test]
    fn test_plan_prefers_longest_step() {
        let migrator = Migrator::with_registry(vec![step(1, 2), step(2, 3), step(1, 3), step(3, 4)], 4);
        let plan = migrator.plan(1, 4).unwrap();
        let versions: Vec<(u32, u32)> = plan.iter().map(|m| (m.from, m.to)).collect();
        assert_eq!(versions, vec![(1, 3), (3, 4)]);
    }

    #[test]
    fn test_plan_rejects_gap_and_downgrade() {
        let migrator = Migrator::with_registry(vec![step(1, 2), step(3, 4)], 4);
        assert!(matches!(
            migrator.plan(1, 4),
            Err(DbError::MissingMigration { from: 1, to: 4 })
        ));
        assert!(matches!(
            migrator.validate_registry(),
            Err(DbError::MissingMigration { from: 2, to: 3 })
        ));

        assert!(matches!(
            Migrator::new().plan(6, CURRENT_VERSION),
            Err(DbError::MissingMigration { from: 6, to: 5 })
        ));
    }

    #[test]
    fn test_registry_rejects_backward_step() {
        let migrator = Migrator::with_registry(vec![step(1, 2), step(2, 1)], 2);
        assert!(matches!(migrator.validate_registry(), Err(DbError::MigrationFailed(_))));
    }
}
