//! User types for highchair.
//!
//! A `User` is the registered account row. A `SessionUser` is the trimmed,
//! de-normalized copy (no password) recorded as the current user on login.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PlannerError, Result};

/// Minimum accepted password length at signup.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Gender of the child, used by the UI for theming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => f.write_str("male"),
            Self::Female => f.write_str("female"),
        }
    }
}

/// A registered user.
///
/// The password is stored and compared in plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique, case-sensitive username. Primary key of the `users` table.
    pub username: String,

    /// Plaintext password.
    pub password: String,

    /// Gender of the child.
    pub gender: Gender,
}

impl User {
    /// Create a new user record.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>, gender: Gender) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            gender,
        }
    }

    /// Check a login attempt against the stored password.
    #[must_use]
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    /// The session view of this user, without the password.
    #[must_use]
    pub fn session(&self) -> SessionUser {
        SessionUser {
            username: self.username.clone(),
            gender: self.gender,
        }
    }
}

/// The logged-in user as recorded in the `currentUser` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Username of the logged-in user.
    pub username: String,

    /// Gender of the child.
    pub gender: Gender,
}

/// Validate signup credentials.
///
/// # Errors
///
/// - `PlannerError::EmptyCredentials` if either field is empty.
/// - `PlannerError::InvalidUsername` if the name has characters outside `[A-Za-z0-9_]`.
/// - `PlannerError::WeakPassword` if the password lacks a letter or a digit.
/// - `PlannerError::PasswordTooShort` if the password is under `MIN_PASSWORD_LEN`.
pub fn validate_signup(username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        return Err(PlannerError::EmptyCredentials);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(PlannerError::InvalidUsername);
    }

    let has_letters = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digits = password.chars().any(|c| c.is_ascii_digit());
    if !has_letters || !has_digits {
        return Err(PlannerError::WeakPassword);
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PlannerError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(())
}
