//! Database schema definitions and versioning.
//!
//! The schema is a fixed set of tables plus a single integer version. The
//! version only gates the creation step: when it is missing or older than
//! `SCHEMA_VERSION`, every absent table is created and the version is written.
//! Table creation checks for existence first, so reopening is a no-op.

use crate::error::{Result, StoreError};

/// Current schema version. Bumped only on structural change.
pub const SCHEMA_VERSION: u32 = 1;

/// Table names.
pub mod table {
    /// Registered users, keyed by `username`.
    pub const USERS: &str = "users";

    /// Per-user planner data, keyed by `username`.
    pub const USER_DATA: &str = "userData";

    /// Singleton current-user row, keyed by the `currentUser` sentinel.
    pub const CURRENT_USER: &str = "currentUser";

    /// Engine bookkeeping (schema version). Not a record table.
    pub const META: &str = "meta";
}

/// Key under which the schema version is stored in the `meta` table.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// A table declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Table name.
    pub name: &'static str,
    /// Record field holding the primary key.
    pub key_path: &'static str,
}

/// All record tables, in creation order.
pub const TABLES: [TableDef; 3] = [
    TableDef {
        name: table::USERS,
        key_path: "username",
    },
    TableDef {
        name: table::USER_DATA,
        key_path: "username",
    },
    TableDef {
        name: table::CURRENT_USER,
        key_path: "id",
    },
];

/// The operations an engine exposes to the upgrade hook.
pub trait SchemaHost {
    /// The version recorded in the database, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored version cannot be read.
    fn stored_version(&self) -> Result<Option<u32>>;

    /// Whether a table already exists.
    fn has_table(&self, name: &str) -> bool;

    /// Create an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot create the table.
    fn create_table(&self, def: &TableDef) -> Result<()>;

    /// Record the schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be written.
    fn set_version(&self, version: u32) -> Result<()>;
}

/// Run the upgrade hook if the stored version requires it.
///
/// Returns `true` if the hook ran.
///
/// # Errors
///
/// - `StoreError::SchemaVersion` if the database is newer than this build.
/// - Any engine error raised while creating tables.
pub fn ensure_schema<H: SchemaHost + ?Sized>(host: &H) -> Result<bool> {
    let stored = host.stored_version()?;
    match stored {
        Some(found) if found > SCHEMA_VERSION => Err(StoreError::SchemaVersion {
            found,
            supported: SCHEMA_VERSION,
        }),
        Some(found) if found == SCHEMA_VERSION => Ok(false),
        _ => {
            tracing::info!(from = ?stored, to = SCHEMA_VERSION, "Upgrading store schema");
            for def in &TABLES {
                if !host.has_table(def.name) {
                    host.create_table(def)?;
                    tracing::debug!(table = def.name, key_path = def.key_path, "Created table");
                }
            }
            host.set_version(SCHEMA_VERSION)?;
            Ok(true)
        }
    }
}

/// Encode a schema version for the `meta` table.
#[must_use]
pub fn encode_version(version: u32) -> [u8; 4] {
    version.to_be_bytes()
}

/// Decode a schema version from the `meta` table.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the value is not 4 bytes.
pub fn decode_version(bytes: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = bytes
        .try_into()
        .map_err(|_| StoreError::Serialization(format!("bad schema version: {bytes:?}")))?;
    Ok(u32::from_be_bytes(bytes))
}
