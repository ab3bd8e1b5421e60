//! # Application Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`FASTCA_*`, `RUST_LOG`)
//! 2. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Grace window of shared screen state after the last observer detaches.
pub const DEFAULT_STATE_TIMEOUT_MS: u64 = 5_000;

/// File name of the store inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "fastca_database.db";

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,fastca=debug,sqlx=warn";

pub const ENV_DB_PATH: &str = "FASTCA_DB_PATH";
pub const ENV_STATE_TIMEOUT_MS: &str = "FASTCA_STATE_TIMEOUT_MS";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Explicit database file. `None` selects the platform data directory.
    pub database_path: Option<PathBuf>,

    /// How long shared state stays subscribed to the store after its last
    /// observer leaves, in milliseconds.
    pub state_timeout_ms: u64,

    /// `tracing` filter directive.
    pub log_filter: String,

    /// Environment values that failed to parse, as `(variable, value)`.
    /// Read before logging is installed; reported by `init_tracing`.
    #[serde(skip)]
    rejected: Vec<(String, String)>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: None,
            state_timeout_ms: DEFAULT_STATE_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            rejected: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Creates a configuration from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `FASTCA_DB_PATH`: Use this database file
    /// - `FASTCA_STATE_TIMEOUT_MS`: Override the grace window
    /// - `RUST_LOG`: Override the log filter
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = AppConfig::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_STATE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.state_timeout_ms = ms,
                Err(_) => config
                    .rejected
                    .push((ENV_STATE_TIMEOUT_MS.to_string(), raw)),
            }
        }

        if let Some(filter) = lookup(ENV_LOG_FILTER).filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }

        config
    }

    /// Environment values ignored because they did not parse.
    pub fn rejected(&self) -> &[(String, String)] {
        &self.rejected
    }

    /// Sets the database file.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the grace window.
    pub fn with_state_timeout(mut self, timeout: Duration) -> Self {
        self.state_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Grace window as a [`Duration`].
    pub fn state_timeout(&self) -> Duration {
        Duration::from_millis(self.state_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.state_timeout(), Duration::from_secs(5));
        assert_eq!(config.database_path, None);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/fastca.db"),
            (ENV_STATE_TIMEOUT_MS, "250"),
            (ENV_LOG_FILTER, "debug"),
        ]));

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/fastca.db")));
        assert_eq!(config.state_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_timeout_keeps_default() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_STATE_TIMEOUT_MS, "soon")]));
        assert_eq!(config.state_timeout_ms, DEFAULT_STATE_TIMEOUT_MS);
        assert_eq!(
            config.rejected(),
            &[(ENV_STATE_TIMEOUT_MS.to_string(), "soon".to_string())]
        );
    }

    #[test]
    fn test_valid_environment_rejects_nothing() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_STATE_TIMEOUT_MS, " 100 ")]));
        assert!(config.rejected().is_empty());
        assert_eq!(config.state_timeout_ms, 100);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"stateTimeoutMs": 0}"#).unwrap();
        assert_eq!(config.state_timeout(), Duration::ZERO);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }
}
