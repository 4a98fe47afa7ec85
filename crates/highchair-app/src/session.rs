//! A logged-in user's working session.

use std::time::Duration;

use highchair_core::{PlannerError, SessionUser};

use crate::auth::AuthService;
use crate::autosave::AutoSaver;
use crate::planner::{Planner, PlannerState};

/// The logged-in user, their planner state and its auto-saver.
pub struct Session {
    user: SessionUser,
    state: PlannerState,
    saver: AutoSaver,
}

impl Session {
    /// Start a session over loaded planner state.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn new(
        user: SessionUser,
        state: PlannerState,
        planner: Planner,
        debounce: Duration,
    ) -> Self {
        Self {
            user,
            state,
            saver: AutoSaver::spawn(planner, debounce),
        }
    }

    /// The logged-in user.
    #[must_use]
    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    /// The current planner state.
    #[must_use]
    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    /// Apply an edit and schedule the result for saving.
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut PlannerState) -> T) -> T {
        let out = f(&mut self.state);
        self.saver.schedule(&self.user.username, self.state.clone());
        out
    }

    /// Save anything pending right away.
    pub async fn save_now(&self) -> bool {
        self.saver.flush().await
    }

    /// Save anything pending, then log out.
    ///
    /// The logout happens even if the save fails.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Storage` if the logout cannot be recorded.
    pub async fn end(self, auth: &AuthService) -> Result<(), PlannerError> {
        if !self.saver.flush().await {
            tracing::error!(username = %self.user.username, "Failed to save before logout");
        }
        self.saver.shutdown().await;
        auth.logout().await
    }
}
