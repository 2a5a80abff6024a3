//! Runtime configuration for the StaffNote core.
//!
//! # Responsibility
//! - Resolve log level, log directory and database path.
//! - Apply `STAFFNOTE_*` environment overrides on top of build defaults.
//!
//! # Invariants
//! - Defaults never fail; blank overrides fall back to defaults.
//! - Paths are resolved, not created; creation happens in logging/db open.

use crate::db::{open_db, DbResult};
use crate::logging::{default_log_level, init_logging, LoggingError};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "STAFFNOTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STAFFNOTE_LOG_DIR";
pub const ENV_DB_PATH: &str = "STAFFNOTE_DB_PATH";

const DEFAULT_LOG_DIR_NAME: &str = "staffnote-logs";
const DEFAULT_DB_FILE_NAME: &str = "staffnote.sqlite3";

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let temp_dir = std::env::temp_dir();
        Self {
            log_level: default_log_level().to_string(),
            log_dir: temp_dir.join(DEFAULT_LOG_DIR_NAME),
            db_path: temp_dir.join(DEFAULT_DB_FILE_NAME),
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `STAFFNOTE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Parses a JSON config document; missing keys take defaults.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Applies overrides from `lookup`, ignoring blank values.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(path) = read(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        self
    }

    /// Starts logging with this configuration.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        init_logging(&self.log_level, &self.log_dir.to_string_lossy())
    }

    /// Opens (and migrates) the configured database file.
    pub fn open_db(&self) -> DbResult<Connection> {
        open_db(&self.db_path)
    }
}
