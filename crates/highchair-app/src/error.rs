//! Application error types.

/// Errors that stop the application from booting.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A configuration variable is malformed.
    #[error("configuration error: {0}")]
    Config(String),
}
