//! # FastCa Application Library
//!
//! Start-up and screen state for FastCa. The UI toolkit is a separate
//! collaborator; it receives an [`App`] and observes the state holders.
//!
//! ## Module Organization
//! ```text
//! fastca/
//! ├── lib.rs              ◄─── You are here (start-up, App handle)
//! ├── config.rs           ◄─── AppConfig (env + defaults)
//! ├── error.rs            ◄─── AppError for the presentation layer
//! └── state/
//!     ├── mod.rs          ◄─── State exports
//!     ├── shared.rs       ◄─── SharedState: refcounted upstream + grace window
//!     ├── item_list.rs    ◄─── Item list screen
//!     └── item_detail.rs  ◄─── Item detail screen
//! ```

pub mod config;
pub mod error;
pub mod state;

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::{AppConfig, DATABASE_FILE_NAME};
use error::{AppError, AppResult};
use fastca_db::{Database, DbConfig};
use state::{ItemDetailState, ItemListState};

/// Running application: configuration plus the open store.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Load Configuration ───────────────────────────────────────────────► │
/// │     • AppConfig::from_env()                                             │
/// │                                                                         │
/// │  2. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter                                │
/// │                                                                         │
/// │  3. Determine Database Path ──────────────────────────────────────────► │
/// │     • FASTCA_DB_PATH, else the platform data directory                  │
/// │                                                                         │
/// │  4. Open Database ────────────────────────────────────────────────────► │
/// │     • SQLite with WAL mode, foreign keys on                             │
/// │     • Migrate to the current schema and validate it                     │
/// │     • Any failure here is fatal: the app must not proceed               │
/// │                                                                         │
/// │  5. Hand out screen state ────────────────────────────────────────────► │
/// │     • item_list(), item_detail(owner_id)                                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone)]
pub struct App {
    config: AppConfig,
    db: Database,
}

impl App {
    /// Opens the store described by `config`.
    ///
    /// ## Returns
    /// * `Ok(App)` - Store open at the current schema
    /// * `Err(AppError)` with `fatal` set - Store cannot be used
    pub async fn start(config: AppConfig) -> AppResult<Self> {
        let db_path = database_path(&config)?;
        info!(db_path = %db_path.display(), "Database path determined");

        let db = Database::new(DbConfig::new(db_path)).await?;
        info!("Database connected and migrations applied");

        Ok(App::with_database(config, db))
    }

    /// Wraps an already open database.
    pub fn with_database(config: AppConfig, db: Database) -> Self {
        App { config, db }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// State for the item list screen.
    pub fn item_list(&self) -> AppResult<ItemListState> {
        ItemListState::new(self.db.repository(), self.config.state_timeout())
    }

    /// State for the detail screen of `owner_id`.
    pub fn item_detail(&self, owner_id: impl Into<String>) -> AppResult<ItemDetailState> {
        ItemDetailState::new(self.db.repository(), owner_id, self.config.state_timeout())
    }

    /// Closes the store.
    pub async fn shutdown(&self) {
        info!("Shutting down");
        self.db.close().await;
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=fastca_db=trace` - Show invalidation traffic
/// - Default: `info,fastca=debug,sqlx=warn`
///
/// Calling it twice keeps the first subscriber. Configuration values that
/// were ignored while loading are logged once the subscriber is in place.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        debug!("Tracing subscriber already installed");
    }

    for (variable, value) in config.rejected() {
        warn!(%variable, %value, "Ignoring invalid configuration value");
    }
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.fastca.fastca/fastca_database.db`
/// - **Windows**: `%APPDATA%\fastca\fastca\data\fastca_database.db`
/// - **Linux**: `~/.local/share/fastca/fastca_database.db`
///
/// ## Development Override
/// `FASTCA_DB_PATH` (see [`AppConfig::from_env`]).
pub fn database_path(config: &AppConfig) -> AppResult<PathBuf> {
    if let Some(path) = &config.database_path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "fastca", "fastca")
        .ok_or_else(|| AppError::internal("Could not determine app data directory"))?;

    let data_dir = proj_dirs.data_dir();

    // Create directory if it doesn't exist
    std::fs::create_dir_all(data_dir).map_err(|e| {
        AppError::internal(format!("Could not create {}: {}", data_dir.display(), e))
    })?;

    Ok(data_dir.join(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn app() -> App {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = AppConfig::default().with_state_timeout(Duration::ZERO);
        App::with_database(config, db)
    }

    #[test]
    fn test_init_tracing_reports_rejected_values() {
        let config = AppConfig::from_lookup(|key| {
            (key == config::ENV_STATE_TIMEOUT_MS).then(|| "soon".to_string())
        });
        assert_eq!(config.rejected().len(), 1);

        // A second call keeps the installed subscriber
        init_tracing(&config);
        init_tracing(&config);
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let config = AppConfig::default().with_database_path("/tmp/custom.db");
        assert_eq!(database_path(&config).unwrap(), PathBuf::from("/tmp/custom.db"));
    }

    #[tokio::test]
    async fn test_list_and_detail_share_the_store() {
        let app = app().await;
        let list = app.item_list().unwrap();
        let item = list.add_item().await.unwrap();

        let detail = app.item_detail(&item.id).unwrap();
        let mut rows = detail.measurements();
        detail.add_measurement().await.unwrap();

        let loaded = tokio::time::timeout(Duration::from_secs(5), rows.wait_for(|l| l.len() == 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded[0].owner_id, item.id);
    }

    #[tokio::test]
    async fn test_shutdown_closes_store() {
        let app = app().await;
        assert!(app.database().health_check().await);
        app.shutdown().await;
        assert!(!app.database().health_check().await);
    }
}
