//! Error types for highchair storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The host has no usable persistent storage.
    #[error("storage engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Insert of a key that already exists.
    #[error("unique key violation in {table}: {key}")]
    UniqueKeyViolation {
        /// The table written to.
        table: &'static str,
        /// The duplicated key.
        key: String,
    },

    /// Any other engine-level fault (I/O, corruption, missing table).
    #[error("transaction fault: {0}")]
    Transaction(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The database was written by a newer schema than this build supports.
    #[error("unsupported schema version: found={found}, supported={supported}")]
    SchemaVersion {
        /// Version recorded in the database.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },

    /// Reading or writing the legacy flat-key area failed.
    #[error("legacy storage error: {0}")]
    Legacy(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(feature = "rocksdb-backend")]
impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Transaction(e.into_string())
    }
}
