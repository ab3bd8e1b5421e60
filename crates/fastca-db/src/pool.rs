//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Opening the Store                                  │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       │  1. open pool (WAL, foreign keys ON)                           │
//! │       │  2. run migration chain to CURRENT_VERSION                     │
//! │       │  3. verify schema against schema::expected()                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  Database { pool, tracker }             │                           │
//! │  │     ├── items()         → ItemDao       │                           │
//! │  │     ├── measurements()  → MeasurementDao│                           │
//! │  │     └── repository()    → ItemRepository│                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  Every DAO handed out shares the same pool and InvalidationTracker,    │
//! │  so a write through one is seen by live queries of all others.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Readers don't block the writer, so live queries re-running after a commit
//! never stall the next write.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::dao::item::ItemDao;
use crate::dao::measurement::MeasurementDao;
use crate::error::{DbError, DbResult};
use crate::migrations::Migrator;
use crate::observer::InvalidationTracker;
use crate::repository::ItemRepository;
use crate::schema::{self, SchemaSnapshot};

/// Path value selecting a private in-memory database.
const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/fastca_database.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes, `None` for in-memory databases
    pub idle_timeout: Option<Duration>,

    /// Whether to migrate and verify the schema on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to migrate and verify the schema on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// The pool holds exactly one connection that is never recycled; the
    /// database lives as long as that connection.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
        }
    }

    /// True when this configuration selects an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY_PATH)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
        };

        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite ships with foreign keys off; cascades depend on them
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing DAO and repository access.
///
/// Cloning is cheap: the pool and tracker are shared.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new(path)).await?;
/// let repo = db.repository();
///
/// let item = Item::new();
/// repo.add_item(&item).await?;
/// repo.add_measurement(&Measurement::new(&item.id)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Change notifications shared by every DAO of this database.
    tracker: InvalidationTracker,
}

impl Database {
    /// Opens the store, migrating it to the current schema.
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError::ConnectionFailed)` - File could not be opened
    /// * `Err(DbError::MissingMigration)` - On-disk version has no upgrade path
    /// * `Err(DbError::MigrationFailed)` - A step failed and was rolled back
    /// * `Err(DbError::SchemaMismatch)` - Resulting schema is not the expected one
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = config.connect_options()?;
        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(if config.is_in_memory() {
                None
            } else {
                Some(Duration::from_secs(30 * 60))
            })
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            tracker: InvalidationTracker::new(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Migrates to the current version, then verifies the schema.
    ///
    /// Idempotent: a database already at the current version is only
    /// verified.
    ///
    /// ## Returns
    /// Schema version after the run.
    pub async fn run_migrations(&self) -> DbResult<u32> {
        let version = Migrator::new().run(&self.pool).await?;
        self.verify_schema().await?;
        info!(version, "Database schema ready");
        Ok(version)
    }

    /// Compares the on-disk schema with [`schema::expected`].
    pub async fn verify_schema(&self) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        let snapshot = SchemaSnapshot::read(&mut conn).await?;

        snapshot.verify(&schema::expected()).map_err(|e| {
            error!(error = %e, "Schema validation failed");
            e
        })
    }

    /// Returns a reference to the connection pool.
    ///
    /// For advanced queries not covered by the DAOs.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the shared invalidation tracker.
    pub fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    /// Returns the item DAO.
    pub fn items(&self) -> ItemDao {
        ItemDao::new(self.pool.clone(), self.tracker.clone())
    }

    /// Returns the measurement DAO.
    pub fn measurements(&self) -> MeasurementDao {
        MeasurementDao::new(self.pool.clone(), self.tracker.clone())
    }

    /// Returns the repository facade over both DAOs.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let mut items = db.repository().all_items();
    /// ```
    pub fn repository(&self) -> ItemRepository {
        ItemRepository::new(self.items(), self.measurements())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all DAO operations fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    ///
    /// ## Returns
    /// * `true` - Database is responsive
    /// * `false` - Database is unavailable
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{schema_version, CURRENT_VERSION};

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = DbConfig::in_memory();
        let db = Database::new(config).await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(schema_version(db.pool()).await.unwrap(), CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.run_migrations().await.unwrap(), CURRENT_VERSION);
        assert_eq!(db.run_migrations().await.unwrap(), CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_close_fails_health_check() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_daos_share_tracker() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let _items = db.items().observe_all();
        let _measurements = db.repository().measurements_for("A");

        assert_eq!(db.tracker().subscriber_count(), 2);
    }
}
