//! Runtime configuration.
//!
//! Values come from the environment with fallbacks; the CLI may override
//! any of them afterwards.

use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::sqlite::DEFAULT_BUSY_TIMEOUT;

pub const DB_PATH_ENV: &str = "NUTRISENSE_DB_PATH";
pub const MODEL_DIR_ENV: &str = "NUTRISENSE_MODEL_DIR";
pub const REFERENCE_FILE_ENV: &str = "NUTRISENSE_REFERENCE_FILE";
pub const BUSY_TIMEOUT_ENV: &str = "NUTRISENSE_SQLITE_BUSY_TIMEOUT_MS";

const DEFAULT_DB_PATH: &str = "data/nutrisense.db";
const DEFAULT_MODEL_DIR: &str = "models";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite ledger location
    pub db_path: PathBuf,

    /// Directory holding `forest.json` (and optionally `manifest.json`)
    pub model_dir: PathBuf,

    /// Height-for-age table to load instead of the built-in one
    pub reference_file: Option<PathBuf>,

    pub busy_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            reference_file: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl Config {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - NUTRISENSE_DB_PATH
    /// - NUTRISENSE_MODEL_DIR
    /// - NUTRISENSE_REFERENCE_FILE
    /// - NUTRISENSE_SQLITE_BUSY_TIMEOUT_MS
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(DB_PATH_ENV) {
            cfg.db_path = PathBuf::from(v.trim());
        }

        if let Some(v) = non_empty(MODEL_DIR_ENV) {
            cfg.model_dir = PathBuf::from(v.trim());
        }

        if let Some(v) = non_empty(REFERENCE_FILE_ENV) {
            cfg.reference_file = Some(PathBuf::from(v.trim()));
        }

        if let Some(v) = non_empty(BUSY_TIMEOUT_ENV) {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => cfg.busy_timeout = Duration::from_millis(ms),
                _ => tracing::warn!(
                    "Ignoring invalid {}={:?}, using {} ms",
                    BUSY_TIMEOUT_ENV,
                    v,
                    cfg.busy_timeout.as_millis()
                ),
            }
        }

        cfg
    }
}
