//! `RocksDB` storage engine.
//!
//! Each table is a column family. Column families are discovered at open time
//! and the missing ones are created by the schema hook, so an existing
//! database opens with exactly the families it already has.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options,
};

use crate::engine::{missing_table, Engine};
use crate::error::{Result, StoreError};
use crate::schema::{self, table, SchemaHost, TableDef, SCHEMA_VERSION_KEY};

/// RocksDB-backed engine.
pub struct RocksEngine {
    db: DBWithThreadMode<MultiThreaded>,
    // Serializes the check-then-put of `insert`.
    insert_guard: Mutex<()>,
}

impl RocksEngine {
    /// Open or create a `RocksDB` database at the given path and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, or if its schema is
    /// newer than this build.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // A fresh directory has no column families to list yet.
        let existing = DBWithThreadMode::<MultiThreaded>::list_cf(&opts, path).unwrap_or_default();
        let cf_descriptors: Vec<_> = existing
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;
        let engine = Self {
            db,
            insert_guard: Mutex::new(()),
        };

        if schema::ensure_schema(&engine)? {
            tracing::info!(path = %path.display(), "Created store schema");
        }

        Ok(engine)
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db.cf_handle(name).ok_or_else(|| missing_table(name))
    }
}

impl Engine for RocksEngine {
    fn get(&self, table: &'static str, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(table)?;
        Ok(self.db.get_cf(&cf, key)?)
    }

    fn get_all(&self, table: &'static str) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(table)?;
        self.db
            .iterator_cf(&cf, IteratorMode::Start)
            .map(|item| item.map(|(_, value)| value.to_vec()).map_err(StoreError::from))
            .collect()
    }

    fn insert(&self, table: &'static str, key: &str, value: &[u8]) -> Result<()> {
        let cf = self.cf(table)?;
        let _guard = self
            .insert_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.db.get_pinned_cf(&cf, key)?.is_some() {
            return Err(StoreError::UniqueKeyViolation {
                table,
                key: key.to_string(),
            });
        }

        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    fn put(&self, table: &'static str, key: &str, value: &[u8]) -> Result<()> {
        let cf = self.cf(table)?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    fn delete(&self, table: &'static str, key: &str) -> Result<()> {
        let cf = self.cf(table)?;
        self.db.delete_cf(&cf, key)?;
        Ok(())
    }
}

impl SchemaHost for RocksEngine {
    fn stored_version(&self) -> Result<Option<u32>> {
        let Some(cf) = self.db.cf_handle(table::META) else {
            return Ok(None);
        };
        self.db
            .get_cf(&cf, SCHEMA_VERSION_KEY)?
            .map(|bytes| schema::decode_version(&bytes))
            .transpose()
    }

    fn has_table(&self, name: &str) -> bool {
        self.db.cf_handle(name).is_some()
    }

    fn create_table(&self, def: &TableDef) -> Result<()> {
        self.db.create_cf(def.name, &Options::default())?;
        Ok(())
    }

    fn set_version(&self, version: u32) -> Result<()> {
        if !self.has_table(table::META) {
            self.db.create_cf(table::META, &Options::default())?;
        }
        let cf = self.cf(table::META)?;
        self.db.put_cf(&cf, SCHEMA_VERSION_KEY, schema::encode_version(version))?;
        Ok(())
    }
}
