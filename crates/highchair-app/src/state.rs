//! Application state and boot sequence.

use std::sync::Arc;

use highchair_core::SessionUser;
use highchair_store::{
    JsonFileStorage, LegacyMigrator, LegacyStorage, LocalStore, MigrationOutcome, StoreStatus,
};

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::planner::Planner;
use crate::session::Session;

/// Application state shared by every screen.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<LocalStore>,

    /// Application configuration.
    pub config: AppConfig,

    /// Login, signup and logout.
    pub auth: AuthService,

    /// Planner state loading and saving.
    pub planner: Planner,
}

/// What the boot sequence found.
pub struct Booted {
    /// The ready application state.
    pub state: AppState,

    /// Result of the legacy migration step.
    pub migration: MigrationOutcome,

    /// The user still logged in from the previous run, if any.
    pub current_user: Option<SessionUser>,
}

impl AppState {
    /// Create the application state over an opened (or opening) store.
    #[must_use]
    pub fn new(store: Arc<LocalStore>, config: AppConfig) -> Self {
        Self {
            auth: AuthService::new(Arc::clone(&store)),
            planner: Planner::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    /// Open the configured store and legacy area, then boot.
    ///
    /// A legacy area that cannot be opened counts as a failed migration;
    /// the application still boots.
    pub async fn boot(config: AppConfig) -> Booted {
        tracing::info!(
            data_dir = %config.data_dir.display(),
            legacy_path = %config.legacy_path.display(),
            in_memory = %config.in_memory,
            "Opening store"
        );
        let store = Arc::new(LocalStore::open(config.store_location()));
        match JsonFileStorage::open(&config.legacy_path) {
            Ok(legacy) => Self::boot_with(config, store, &legacy).await,
            Err(e) => {
                tracing::error!(error = %e, "Cannot open legacy area, skipping migration");
                let migration = MigrationOutcome::Failed { flagged: false };
                Self::finish_boot(config, store, migration).await
            }
        }
    }

    /// Boot over a given store and legacy area: migrate once, then restore
    /// the previous session.
    pub async fn boot_with(
        config: AppConfig,
        store: Arc<LocalStore>,
        legacy: &dyn LegacyStorage,
    ) -> Booted {
        let migration = LegacyMigrator::new(&store, legacy)
            .with_policy(config.migration_policy())
            .run_once()
            .await;
        Self::finish_boot(config, store, migration).await
    }

    async fn finish_boot(
        config: AppConfig,
        store: Arc<LocalStore>,
        migration: MigrationOutcome,
    ) -> Booted {
        if !store.ready().await {
            tracing::warn!("Store unavailable, running without persistence");
        }
        tracing::info!(outcome = ?migration, "Legacy migration checked");

        let state = Self::new(store, config);
        let current_user = state.auth.restore().await;
        match &current_user {
            Some(user) => tracing::info!(username = %user.username, "Restored session"),
            None => tracing::info!("No active session"),
        }

        Booted {
            state,
            migration,
            current_user,
        }
    }

    /// Current store status.
    #[must_use]
    pub fn store_status(&self) -> StoreStatus {
        self.store.status()
    }

    /// Load a user's planner state and start auto-saving it.
    pub async fn start_session(&self, user: SessionUser) -> Session {
        let planner_state = self.planner.load(&user.username).await;
        Session::new(
            user,
            planner_state,
            self.planner.clone(),
            self.config.autosave_debounce,
        )
    }
}
