//! One-time migration from the legacy flat-key area into `LocalStore`.
//!
//! Steps, in order:
//!
//! 1. `users`: parse the array and insert each user (insert, not upsert).
//! 2. `user`: parse and record as the current user.
//! 3. Re-read the current user from the store and copy its
//!    `weekPlan_<name>`, `groceryList_<name>` and `foodTracking_<name>` blobs.
//!
//! The first failure aborts the remaining steps. Rows already written stay
//! written.

use highchair_core::{SessionUser, User};
use serde::Deserialize;

use crate::error::StoreError;
use crate::keys::{self, legacy};
use crate::legacy::LegacyStorage;
use crate::records::UserDataField;
use crate::store::LocalStore;

/// The migration step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    /// Copying the users list.
    Users,
    /// Copying the current-user marker.
    CurrentUser,
    /// Copying a per-user blob.
    UserData(UserDataField),
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Users => f.write_str("users"),
            Self::CurrentUser => f.write_str("current user"),
            Self::UserData(field) => write!(f, "user data ({field})"),
        }
    }
}

/// A migration that stopped part-way.
#[derive(Debug, thiserror::Error)]
#[error("legacy migration failed at {step}: {source}")]
pub struct MigrationError {
    /// Where it stopped.
    pub step: MigrationStep,
    /// Why it stopped.
    #[source]
    pub source: StoreError,
}

/// What to do with the completion flag after a failed migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MigrationPolicy {
    /// Set the flag whatever the outcome; a failed migration is never retried.
    #[default]
    MarkAlways,
    /// Set the flag only after success; a failure is retried on next start.
    RetryOnFailure,
}

/// Result of `LegacyMigrator::run_once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The flag was already set.
    Skipped,
    /// Migration ran and succeeded.
    Completed,
    /// Migration ran and failed.
    Failed {
        /// Whether the completion flag was set anyway.
        flagged: bool,
    },
}

/// Copies legacy flat-key data into a `LocalStore`.
pub struct LegacyMigrator<'a> {
    store: &'a LocalStore,
    legacy: &'a dyn LegacyStorage,
    policy: MigrationPolicy,
}

impl<'a> LegacyMigrator<'a> {
    /// Create a migrator with the default `MarkAlways` policy.
    #[must_use]
    pub fn new(store: &'a LocalStore, legacy: &'a dyn LegacyStorage) -> Self {
        Self {
            store,
            legacy,
            policy: MigrationPolicy::default(),
        }
    }

    /// Choose what happens to the flag after a failure.
    #[must_use]
    pub fn with_policy(mut self, policy: MigrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether the completion flag is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the legacy area cannot be read.
    pub fn is_completed(&self) -> Result<bool, StoreError> {
        Ok(self.legacy.get_item(legacy::MIGRATION_FLAG)?.is_some())
    }

    /// Migrate unless the completion flag is set, then set the flag as the
    /// policy dictates.
    ///
    /// Never fails: an unreadable legacy area or a flag that cannot be
    /// written is logged and reported through the outcome.
    pub async fn run_once(&self) -> MigrationOutcome {
        match self.is_completed() {
            Ok(true) => {
                tracing::debug!("Legacy migration already completed");
                return MigrationOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Cannot read legacy migration flag");
                return MigrationOutcome::Failed { flagged: false };
            }
        }

        let succeeded = self.migrate().await;
        let flag = succeeded || self.policy == MigrationPolicy::MarkAlways;
        let flagged = flag && self.mark_completed();

        if succeeded {
            MigrationOutcome::Completed
        } else {
            if flagged {
                tracing::warn!("Legacy migration failed and will not be retried");
            }
            MigrationOutcome::Failed { flagged }
        }
    }

    fn mark_completed(&self) -> bool {
        match self
            .legacy
            .set_item(legacy::MIGRATION_FLAG, legacy::MIGRATION_FLAG_VALUE)
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to record legacy migration flag");
                false
            }
        }
    }

    /// Run the migration steps. `true` on success; failures are logged.
    pub async fn migrate(&self) -> bool {
        match self.try_migrate().await {
            Ok(()) => {
                tracing::info!("Legacy data migrated");
                true
            }
            Err(e) => {
                tracing::error!(step = %e.step, error = %e.source, "Legacy migration failed");
                false
            }
        }
    }

    /// Run the migration steps, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the failing step and its cause.
    pub async fn try_migrate(&self) -> Result<(), MigrationError> {
        self.migrate_users()
            .await
            .map_err(|source| MigrationError {
                step: MigrationStep::Users,
                source,
            })?;

        self.migrate_current_user()
            .await
            .map_err(|source| MigrationError {
                step: MigrationStep::CurrentUser,
                source,
            })?;

        let current = self
            .store
            .get_current_user()
            .await
            .map_err(|source| MigrationError {
                step: MigrationStep::CurrentUser,
                source,
            })?;

        if let Some(current) = current {
            for field in UserDataField::LEGACY {
                self.migrate_field(&current.username, field)
                    .await
                    .map_err(|source| MigrationError {
                        step: MigrationStep::UserData(field),
                        source,
                    })?;
            }
        }

        Ok(())
    }

    async fn migrate_users(&self) -> Result<(), StoreError> {
        let Some(raw) = self.legacy.get_item(legacy::USERS)? else {
            return Ok(());
        };
        let users: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
        // Records before a malformed one stay inserted.
        for user in &users {
            let user = User::deserialize(user)?;
            self.store.add_user(&user).await?;
        }
        tracing::debug!(count = users.len(), "Migrated legacy users");
        Ok(())
    }

    async fn migrate_current_user(&self) -> Result<(), StoreError> {
        let Some(raw) = self.legacy.get_item(legacy::CURRENT_USER)? else {
            return Ok(());
        };
        let current: Option<SessionUser> = serde_json::from_str(&raw)?;
        self.store.set_current_user(current.as_ref()).await?;
        Ok(())
    }

    async fn migrate_field(&self, username: &str, field: UserDataField) -> Result<(), StoreError> {
        let key = keys::legacy_field_key(field, username);
        let Some(raw) = self.legacy.get_item(&key)? else {
            return Ok(());
        };
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        self.store.update_field(username, field, &value).await?;
        tracing::debug!(username = %username, field = %field, "Migrated legacy user data");
        Ok(())
    }
}
