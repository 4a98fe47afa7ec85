//! Login, signup and session restore.
//!
//! `AuthService` owns the rules for who may log in and who may register. It
//! talks to the store only through `LocalStore`, and never creates a record
//! on a failed attempt.

use std::sync::Arc;

use highchair_core::{
    validate_signup, Gender, GroceryList, PlannerError, SessionUser, User, WeekPlan,
};
use highchair_store::{LocalStore, StoreError, UserData, UserDataField};

/// Authentication against the local user table.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<LocalStore>,
}

impl AuthService {
    /// Create a service over a store.
    #[must_use]
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// Log in an existing user and record them as the current user.
    ///
    /// # Errors
    ///
    /// - `PlannerError::EmptyCredentials` if either field is empty.
    /// - `PlannerError::UserNotFound` if no such user is registered.
    /// - `PlannerError::WrongPassword` if the password does not match.
    /// - `PlannerError::Storage` on store faults.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser, PlannerError> {
        if username.is_empty() || password.is_empty() {
            return Err(PlannerError::EmptyCredentials);
        }

        let user = self
            .store
            .get_user(username)
            .await
            .map_err(|e| storage_error("login", &e))?
            .ok_or_else(|| PlannerError::UserNotFound {
                username: username.to_string(),
            })?;

        if !user.password_matches(password) {
            tracing::debug!(username = %username, "Rejected login, wrong password");
            return Err(PlannerError::WrongPassword);
        }

        let session = user.session();
        self.store
            .set_current_user(Some(&session))
            .await
            .map_err(|e| storage_error("login", &e))?;

        tracing::info!(username = %session.username, "User logged in");
        Ok(session)
    }

    /// Register a new user, log them in and create their planner row.
    ///
    /// # Errors
    ///
    /// - The validation errors of `validate_signup`.
    /// - `PlannerError::UsernameTaken` if the name is already registered.
    /// - `PlannerError::Storage` on store faults.
    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        gender: Gender,
    ) -> Result<SessionUser, PlannerError> {
        validate_signup(username, password)?;

        let taken = self
            .store
            .get_user(username)
            .await
            .map_err(|e| storage_error("signup", &e))?
            .is_some();
        if taken {
            return Err(PlannerError::UsernameTaken {
                username: username.to_string(),
            });
        }

        let user = User::new(username, password, gender);
        match self.store.add_user(&user).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(username = %username, "Signup not persisted, store unavailable");
                return Err(PlannerError::Storage("store unavailable".to_string()));
            }
            // Lost a race with another signup of the same name.
            Err(StoreError::UniqueKeyViolation { .. }) => {
                return Err(PlannerError::UsernameTaken {
                    username: username.to_string(),
                });
            }
            Err(e) => return Err(storage_error("signup", &e)),
        }

        let session = user.session();
        self.store
            .set_current_user(Some(&session))
            .await
            .map_err(|e| storage_error("signup", &e))?;

        let mut data = UserData::empty(username);
        data.set_field(UserDataField::WeekPlan, to_value(&WeekPlan::default())?);
        data.set_field(UserDataField::GroceryList, to_value(&GroceryList::new())?);
        self.store
            .save_user_data(username, data)
            .await
            .map_err(|e| storage_error("signup", &e))?;

        tracing::info!(username = %username, gender = %gender, "User signed up");
        Ok(session)
    }

    /// Clear the current user.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Storage` on store faults.
    pub async fn logout(&self) -> Result<(), PlannerError> {
        self.store
            .set_current_user(None)
            .await
            .map_err(|e| storage_error("logout", &e))?;
        tracing::info!("User logged out");
        Ok(())
    }

    /// The user logged in when the application last stopped, if any.
    pub async fn restore(&self) -> Option<SessionUser> {
        match self.store.get_current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "Failed to restore session");
                None
            }
        }
    }
}

fn storage_error(action: &str, e: &StoreError) -> PlannerError {
    tracing::error!(action = %action, error = %e, "Store operation failed");
    PlannerError::Storage(e.to_string())
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, PlannerError> {
    serde_json::to_value(value).map_err(|e| PlannerError::Storage(e.to_string()))
}
