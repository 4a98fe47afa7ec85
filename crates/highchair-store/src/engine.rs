//! The key-value engine seam and the in-memory engine.
//!
//! An `Engine` is a set of named tables of string keys to byte values. Each
//! call is its own single-table transaction; nothing spans tables.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use crate::error::{Result, StoreError};
use crate::schema::{self, SchemaHost, TableDef};

/// The storage engine trait.
///
/// This abstracts the persistent engine under `LocalStore`, allowing for
/// different implementations (`RocksDB` on disk, in-memory for testing).
pub trait Engine: Send + Sync {
    /// Point read.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is missing or the read fails.
    fn get(&self, table: &'static str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Read every value in a table, in engine order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is missing or the read fails.
    fn get_all(&self, table: &'static str) -> Result<Vec<Vec<u8>>>;

    /// Insert a new key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UniqueKeyViolation` if the key already exists.
    fn insert(&self, table: &'static str, key: &str, value: &[u8]) -> Result<()>;

    /// Insert or overwrite a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, table: &'static str, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&self, table: &'static str, key: &str) -> Result<()>;
}

type Tables = HashMap<String, BTreeMap<String, Vec<u8>>>;

/// A non-persistent engine backed by ordered maps.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: RwLock<Tables>,
    version: RwLock<Option<u32>>,
}

impl MemoryEngine {
    /// Create an engine with the current schema applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema hook fails.
    pub fn open() -> Result<Self> {
        let engine = Self::default();
        schema::ensure_schema(&engine)?;
        Ok(engine)
    }

    fn read<T>(&self, table: &str, f: impl FnOnce(&BTreeMap<String, Vec<u8>>) -> T) -> Result<T> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.get(table).map(f).ok_or_else(|| missing_table(table))
    }

    fn write<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> Result<T>,
    ) -> Result<T> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables
            .get_mut(table)
            .ok_or_else(|| missing_table(table))
            .and_then(f)
    }
}

pub(crate) fn missing_table(table: &str) -> StoreError {
    StoreError::Transaction(format!("table not found: {table}"))
}

impl Engine for MemoryEngine {
    fn get(&self, table: &'static str, key: &str) -> Result<Option<Vec<u8>>> {
        self.read(table, |rows| rows.get(key).cloned())
    }

    fn get_all(&self, table: &'static str) -> Result<Vec<Vec<u8>>> {
        self.read(table, |rows| rows.values().cloned().collect())
    }

    fn insert(&self, table: &'static str, key: &str, value: &[u8]) -> Result<()> {
        self.write(table, |rows| {
            if rows.contains_key(key) {
                return Err(StoreError::UniqueKeyViolation {
                    table,
                    key: key.to_string(),
                });
            }
            rows.insert(key.to_string(), value.to_vec());
            Ok(())
        })
    }

    fn put(&self, table: &'static str, key: &str, value: &[u8]) -> Result<()> {
        self.write(table, |rows| {
            rows.insert(key.to_string(), value.to_vec());
            Ok(())
        })
    }

    fn delete(&self, table: &'static str, key: &str) -> Result<()> {
        self.write(table, |rows| {
            rows.remove(key);
            Ok(())
        })
    }
}

impl SchemaHost for MemoryEngine {
    fn stored_version(&self) -> Result<Option<u32>> {
        Ok(*self.version.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn has_table(&self, name: &str) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn create_table(&self, def: &TableDef) -> Result<()> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(def.name.to_string())
            .or_default();
        Ok(())
    }

    fn set_version(&self, version: u32) -> Result<()> {
        *self.version.write().unwrap_or_else(PoisonError::into_inner) = Some(version);
        Ok(())
    }
}
