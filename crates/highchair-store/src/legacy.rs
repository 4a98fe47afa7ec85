//! The legacy flat-key storage area.
//!
//! Before the structured store existed, the app kept everything as JSON
//! strings under ad hoc keys (`users`, `user`, `weekPlan_<name>`, ...). This
//! area is only read during migration; the one thing still written to it is
//! the migration flag.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{Result, StoreError};

/// String-keyed, string-valued storage.
pub trait LegacyStorage: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Legacy` if the area cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Legacy` if the area cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Legacy` if the area cannot be written.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Legacy storage held in memory.
#[derive(Debug, Default)]
pub struct MemoryLegacyStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryLegacyStorage {
    /// Create an empty area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an area pre-filled with items.
    #[must_use]
    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            items: Mutex::new(
                items
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl LegacyStorage for MemoryLegacyStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Legacy storage kept as a single JSON object file.
///
/// The file is loaded once at open. Every write rewrites the whole file
/// through a temporary file and a rename.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Load the area from `path`. A missing file is an empty area.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Legacy` if the file exists but cannot be read
    /// or is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| legacy_error(&path, &e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(legacy_error(&path, &e)),
        };
        tracing::debug!(path = %path.display(), "Opened legacy storage");
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(items).map_err(|e| legacy_error(&self.path, &e))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| legacy_error(&self.path, &e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| legacy_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| legacy_error(&self.path, &e))
    }
}

impl LegacyStorage for JsonFileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        self.persist(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.remove(key).is_some() {
            self.persist(&items)?;
        }
        Ok(())
    }
}

fn legacy_error(path: &Path, e: &dyn std::fmt::Display) -> StoreError {
    StoreError::Legacy(format!("{}: {e}", path.display()))
}
