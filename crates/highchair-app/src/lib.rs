//! Highchair application layer.
//!
//! This crate wires the store to the planner screens:
//!
//! - Configuration from the environment
//! - Boot: open the store, migrate legacy data once, restore the session
//! - Login, signup and logout
//! - Loading, editing and debounced saving of planner state

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod autosave;
pub mod config;
pub mod error;
pub mod planner;
pub mod session;
pub mod state;

pub use auth::AuthService;
pub use autosave::AutoSaver;
pub use config::AppConfig;
pub use error::AppError;
pub use planner::{Planner, PlannerState};
pub use session::Session;
pub use state::{AppState, Booted};
