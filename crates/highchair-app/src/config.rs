//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use highchair_store::{MigrationPolicy, StoreLocation};

use crate::error::AppError;

/// Default `RocksDB` data directory.
const DEFAULT_DATA_DIR: &str = "./data/highchair";

/// File name of the legacy flat-key area inside the data directory.
const LEGACY_FILE: &str = "legacy.json";

/// Default auto-save quiet period.
const DEFAULT_AUTOSAVE_MS: u64 = 2000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Path to the `RocksDB` data directory (default: "./data/highchair").
    pub data_dir: PathBuf,

    /// Path to the legacy flat-key JSON file (default: `<data_dir>/legacy.json`).
    pub legacy_path: PathBuf,

    /// Keep everything in memory instead of on disk (default: false).
    pub in_memory: bool,

    /// Quiet period before a pending snapshot is saved (default: 2s).
    pub autosave_debounce: Duration,

    /// Leave the migration flag unset after a failed migration (default: false).
    pub retry_failed_migration: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to a malformed value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to a malformed value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(
            lookup("HIGHCHAIR_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()),
        );
        let legacy_path = lookup("HIGHCHAIR_LEGACY_PATH")
            .map_or_else(|| data_dir.join(LEGACY_FILE), PathBuf::from);

        let autosave_ms = match lookup("HIGHCHAIR_AUTOSAVE_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::Config(format!("HIGHCHAIR_AUTOSAVE_MS={raw:?}: {e}"))
            })?,
            None => DEFAULT_AUTOSAVE_MS,
        };

        Ok(Self {
            data_dir,
            legacy_path,
            in_memory: parse_flag(&lookup, "HIGHCHAIR_IN_MEMORY")?,
            autosave_debounce: Duration::from_millis(autosave_ms),
            retry_failed_migration: parse_flag(&lookup, "HIGHCHAIR_RETRY_FAILED_MIGRATION")?,
        })
    }

    /// Where the store keeps its data.
    #[must_use]
    pub fn store_location(&self) -> StoreLocation {
        if self.in_memory {
            return StoreLocation::Memory;
        }

        #[cfg(feature = "rocksdb-backend")]
        {
            StoreLocation::Rocks(self.data_dir.clone())
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        {
            tracing::warn!("Built without RocksDB, data will not survive a restart");
            StoreLocation::Memory
        }
    }

    /// What to do with the migration flag after a failure.
    #[must_use]
    pub fn migration_policy(&self) -> MigrationPolicy {
        if self.retry_failed_migration {
            MigrationPolicy::RetryOnFailure
        } else {
            MigrationPolicy::MarkAlways
        }
    }
}

fn parse_flag<F>(lookup: &F, name: &str) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{name}={raw:?}: expected a boolean"))),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            legacy_path: data_dir.join(LEGACY_FILE),
            data_dir,
            in_memory: false,
            autosave_debounce: Duration::from_millis(DEFAULT_AUTOSAVE_MS),
            retry_failed_migration: false,
        }
    }
}
