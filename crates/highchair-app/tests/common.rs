//! Common test utilities for highchair integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use highchair_app::{AppConfig, AppState, Booted};
use highchair_core::SessionUser;
use highchair_store::MigrationOutcome;

/// Quiet period used by test sessions.
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(100);

/// Test harness containing a booted application over a temporary directory.
pub struct TestHarness {
    /// The booted application state.
    pub state: AppState,
    /// Outcome of the boot-time migration.
    pub migration: MigrationOutcome,
    /// The session restored at boot.
    pub current_user: Option<SessionUser>,
    /// Temporary directory for the database (kept alive for test duration).
    pub temp_dir: TempDir,
}

impl TestHarness {
    /// Boot over a fresh directory with no legacy data.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::boot(temp_dir).await
    }

    /// Boot over a fresh directory whose legacy area holds `items`.
    pub async fn with_legacy(items: &[(&str, &str)]) -> Self {
        let items: BTreeMap<&str, &str> = items.iter().copied().collect();
        let contents = serde_json::to_string(&items).expect("Failed to encode legacy items");
        Self::with_legacy_file(&contents).await
    }

    /// Boot over a fresh directory whose legacy file holds `contents` verbatim.
    pub async fn with_legacy_file(contents: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(legacy_path(temp_dir.path()), contents)
            .expect("Failed to write legacy file");
        Self::boot(temp_dir).await
    }

    /// Shut the application down and boot it again over the same directory.
    pub async fn reboot(self) -> Self {
        let Self { state, temp_dir, .. } = self;
        drop(state);
        // Let background tasks release their store handles.
        tokio::time::sleep(Duration::from_millis(50)).await;
        Self::boot(temp_dir).await
    }

    /// Read the raw legacy area.
    pub fn legacy_items(&self) -> BTreeMap<String, String> {
        let contents = std::fs::read_to_string(legacy_path(self.temp_dir.path()))
            .expect("Failed to read legacy file");
        serde_json::from_str(&contents).expect("Failed to decode legacy file")
    }

    async fn boot(temp_dir: TempDir) -> Self {
        let config = test_config(temp_dir.path());
        let Booted {
            state,
            migration,
            current_user,
        } = AppState::boot(config).await;
        Self {
            state,
            migration,
            current_user,
            temp_dir,
        }
    }
}

/// Configuration rooted in `dir`.
pub fn test_config(dir: &Path) -> AppConfig {
    AppConfig {
        data_dir: dir.join("db"),
        legacy_path: legacy_path(dir),
        in_memory: false,
        autosave_debounce: TEST_DEBOUNCE,
        retry_failed_migration: false,
    }
}

fn legacy_path(dir: &Path) -> std::path::PathBuf {
    dir.join("legacy.json")
}
