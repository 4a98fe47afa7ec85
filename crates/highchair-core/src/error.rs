//! Error types for highchair.

/// Result type for highchair domain operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Errors that can occur in highchair domain operations.
///
/// The `Display` output of each variant is the message shown to the end user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    /// Username or password was left empty.
    #[error("please enter a name and a password")]
    EmptyCredentials,

    /// Username contains characters other than letters, digits and underscores.
    #[error("the name may only contain letters, numbers and underscores")]
    InvalidUsername,

    /// Password lacks either a letter or a digit.
    #[error("the password must contain letters and numbers")]
    WeakPassword,

    /// Password is shorter than the minimum length.
    #[error("the password must be at least {min} characters long")]
    PasswordTooShort {
        /// Required minimum length.
        min: usize,
    },

    /// No user is registered under this name.
    #[error("user not found: {username}")]
    UserNotFound {
        /// The username that was looked up.
        username: String,
    },

    /// Password does not match the stored one.
    #[error("incorrect password")]
    WrongPassword,

    /// A user with this name already exists.
    #[error("this name is already registered: {username}")]
    UsernameTaken {
        /// The duplicated username.
        username: String,
    },

    /// Day index outside of the week.
    #[error("invalid day index: {0} (expected 0-6)")]
    InvalidDay(u8),

    /// The operation did not persist.
    #[error("storage error: {0}")]
    Storage(String),
}
