//! Local persistence layer for highchair.
//!
//! This crate provides durable storage for users, per-user planner data and
//! the current session, plus a one-time migration from the legacy flat-key
//! area.
//!
//! # Architecture
//!
//! The store is made of the following tables:
//!
//! - `users`: registered users, keyed by `username`
//! - `userData`: one planner row per user, keyed by `username`
//! - `currentUser`: a single row keyed by the constant `"currentUser"`
//! - `meta`: the schema version
//!
//! Tables live behind the [`Engine`] trait. The `RocksDB` engine maps each
//! table to a column family; the in-memory engine is used for tests and for
//! hosts without a writable data directory.
//!
//! # Example
//!
//! ```no_run
//! use highchair_core::{Gender, User, WeekPlan};
//! use highchair_store::{LocalStore, StoreLocation};
//!
//! # async fn demo() -> highchair_store::Result<()> {
//! let store = LocalStore::open(StoreLocation::Memory);
//!
//! store.add_user(&User::new("Luna", "pass123", Gender::Female)).await?;
//! store.save_week_plan("Luna", &WeekPlan::empty_week()).await;
//!
//! let plan = store.get_week_plan("Luna").await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod error;
pub mod keys;
pub mod legacy;
pub mod migrate;
pub mod records;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;
pub mod store;

pub use engine::{Engine, MemoryEngine};
pub use error::{Result, StoreError};
pub use legacy::{JsonFileStorage, LegacyStorage, MemoryLegacyStorage};
pub use migrate::{
    LegacyMigrator, MigrationError, MigrationOutcome, MigrationPolicy, MigrationStep,
};
pub use records::{CurrentUserRow, Record, UserData, UserDataField};
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksEngine;
pub use schema::SCHEMA_VERSION;
pub use store::{LocalStore, OpenState, StoreLocation, StoreStatus};
