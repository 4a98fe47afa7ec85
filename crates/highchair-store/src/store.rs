//! The readiness-gated local store.
//!
//! `LocalStore` starts opening its engine the moment it is constructed. Every
//! operation first awaits the open outcome. Once the store is `Ready`,
//! operations run against the engine; once it is `Failed`, they short-circuit
//! to safe defaults (empty lists, `None`, `false`) instead of erroring.
//!
//! Raw table operations return `Result`. The derived planner operations
//! (`save_week_plan`, `get_food_tracking`, ...) never fail across the
//! boundary: faults are logged and mapped to `false` / `None`.

use std::collections::HashMap;
#[cfg(feature = "rocksdb-backend")]
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use highchair_core::{FoodTracking, GroceryList, SessionUser, User, WeekPlan};

use crate::engine::{Engine, MemoryEngine};
use crate::error::{Result, StoreError};
use crate::keys;
use crate::records::{CurrentUserRow, Record, UserData, UserDataField};

/// Open lifecycle of a store.
///
/// `Unopened → Opening → Ready | Failed`. `Ready` and `Failed` are terminal.
pub enum OpenState {
    /// Constructed, open not yet started.
    Unopened,
    /// The engine is being opened.
    Opening,
    /// The engine is open.
    Ready(Arc<dyn Engine>),
    /// The engine could not be opened; persistence is disabled.
    Failed,
}

impl OpenState {
    /// Whether the open outcome is known.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed)
    }

    /// The state without the engine handle.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        match self {
            Self::Unopened => StoreStatus::Unopened,
            Self::Opening => StoreStatus::Opening,
            Self::Ready(_) => StoreStatus::Ready,
            Self::Failed => StoreStatus::Failed,
        }
    }
}

/// A snapshot of `OpenState` for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Constructed, open not yet started.
    Unopened,
    /// The engine is being opened.
    Opening,
    /// The engine is open.
    Ready,
    /// Persistence is disabled.
    Failed,
}

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A `RocksDB` database directory.
    #[cfg(feature = "rocksdb-backend")]
    Rocks(PathBuf),
    /// Process memory; nothing survives a restart.
    Memory,
    /// No persistent storage on this host.
    Unavailable,
}

/// Durable, schema-managed persistence for users, planner data and the
/// current session.
pub struct LocalStore {
    state: watch::Receiver<OpenState>,
    // One async lock per username so read-modify-write saves of the same
    // `userData` row never interleave. Entries live only while held or awaited.
    row_locks: RowLocks,
}

type RowLocks = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Exclusive hold on one user's row. Dropping it releases the lock and
/// forgets the entry once nobody else holds or awaits it.
struct RowGuard<'a> {
    locks: &'a RowLocks,
    username: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Released under the map lock, so no waiter can clone the entry
        // between the count check and the removal.
        drop(self.guard.take());
        if locks
            .get(&self.username)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.username);
        }
    }
}

impl LocalStore {
    /// Start opening a store at the given location.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn open(location: StoreLocation) -> Self {
        match location {
            #[cfg(feature = "rocksdb-backend")]
            StoreLocation::Rocks(path) => Self::open_with(move || {
                let engine = crate::rocks::RocksEngine::open(&path)?;
                Ok(Arc::new(engine) as Arc<dyn Engine>)
            }),
            StoreLocation::Memory => Self::open_with(|| {
                let engine = MemoryEngine::open()?;
                Ok(Arc::new(engine) as Arc<dyn Engine>)
            }),
            StoreLocation::Unavailable => Self::open_with(|| {
                Err(StoreError::EngineUnavailable(
                    "no persistent storage on this host".into(),
                ))
            }),
        }
    }

    /// Start opening a store with a custom engine opener.
    ///
    /// The opener runs on the blocking pool. Operations issued before it
    /// returns wait for it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn open_with<F>(opener: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn Engine>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(OpenState::Unopened);
        tx.send_replace(OpenState::Opening);

        tokio::spawn(async move {
            let next = match tokio::task::spawn_blocking(opener).await {
                Ok(Ok(engine)) => {
                    tracing::info!("Store opened");
                    OpenState::Ready(engine)
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Failed to open store, data will not be persisted");
                    OpenState::Failed
                }
                Err(e) => {
                    tracing::error!(error = %e, "Store open task aborted");
                    OpenState::Failed
                }
            };
            tx.send_replace(next);
        });

        Self {
            state: rx,
            row_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Current open status, without waiting.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.state.borrow().status()
    }

    /// Wait for the open outcome. `true` if the store is ready.
    pub async fn ready(&self) -> bool {
        self.engine().await.is_some()
    }

    /// The engine once open, or `None` if the open failed.
    async fn engine(&self) -> Option<Arc<dyn Engine>> {
        let mut rx = self.state.clone();
        let state = rx.wait_for(OpenState::is_settled).await.ok()?;
        match &*state {
            OpenState::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    async fn lock_row(&self, username: &str) -> RowGuard<'_> {
        let lock = {
            let mut locks = self.row_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(username.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        RowGuard {
            locks: &self.row_locks,
            username: username.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn row_lock_count(&self) -> usize {
        self.row_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // =========================================================================
    // Generic record access
    // =========================================================================

    async fn get_record<R: Record>(&self, key: &str) -> Result<Option<R>> {
        let Some(engine) = self.engine().await else {
            return Ok(None);
        };
        engine
            .get(R::TABLE, key)?
            .map(|data| deserialize(&data))
            .transpose()
    }

    async fn get_all_records<R: Record>(&self) -> Result<Vec<R>> {
        let Some(engine) = self.engine().await else {
            return Ok(Vec::new());
        };
        engine
            .get_all(R::TABLE)?
            .iter()
            .map(|data| deserialize(data))
            .collect()
    }

    async fn insert_record<R: Record>(&self, record: &R) -> Result<bool> {
        let Some(engine) = self.engine().await else {
            return Ok(false);
        };
        engine.insert(R::TABLE, record.key(), &serialize(record)?)?;
        Ok(true)
    }

    async fn put_record<R: Record>(&self, record: &R) -> Result<bool> {
        let Some(engine) = self.engine().await else {
            return Ok(false);
        };
        engine.put(R::TABLE, record.key(), &serialize(record)?)?;
        Ok(true)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// All registered users, in engine order.
    ///
    /// # Errors
    ///
    /// Returns an error on engine or decoding faults.
    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.get_all_records().await
    }

    /// Look up a user by exact username.
    ///
    /// # Errors
    ///
    /// Returns an error on engine or decoding faults.
    pub async fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.get_record(username).await
    }

    /// Register a new user. `Ok(false)` when persistence is disabled.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UniqueKeyViolation` if the username is taken.
    pub async fn add_user(&self, user: &User) -> Result<bool> {
        let added = self.insert_record(user).await?;
        if added {
            tracing::debug!(username = %user.username, "Added user");
        }
        Ok(added)
    }

    // =========================================================================
    // User data
    // =========================================================================

    /// The planner row of a user, or an empty row if none was saved yet.
    /// `None` only when persistence is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error on engine or decoding faults.
    pub async fn get_user_data(&self, username: &str) -> Result<Option<UserData>> {
        if !self.ready().await {
            return Ok(None);
        }
        let data = self.get_record::<UserData>(username).await?;
        Ok(Some(data.unwrap_or_else(|| UserData::empty(username))))
    }

    /// Overwrite the planner row of a user. The row is keyed by `username`
    /// regardless of `data.username`.
    ///
    /// # Errors
    ///
    /// Returns an error on engine or encoding faults.
    pub async fn save_user_data(&self, username: &str, mut data: UserData) -> Result<bool> {
        data.username = username.to_string();
        let _row = self.lock_row(username).await;
        self.put_record(&data).await
    }

    /// Overlay a single payload field on a user's row.
    ///
    /// Reads the current row (or an empty one), replaces `field`, and writes
    /// the merged row back. Updates to the same user are serialized, so
    /// concurrent updates of different fields all persist.
    ///
    /// # Errors
    ///
    /// Returns an error on engine or encoding faults.
    pub async fn update_field<T: Serialize + ?Sized>(
        &self,
        username: &str,
        field: UserDataField,
        value: &T,
    ) -> Result<bool> {
        let value = serde_json::to_value(value)?;
        let _row = self.lock_row(username).await;

        let Some(mut data) = self.get_user_data(username).await? else {
            return Ok(false);
        };
        data.set_field(field, value);
        let saved = self.put_record(&data).await?;
        tracing::debug!(username = %username, field = %field, "Saved user data field");
        Ok(saved)
    }

    /// Read a single payload field of a user's row.
    ///
    /// # Errors
    ///
    /// Returns an error on engine faults, or if the stored value does not
    /// decode as `T`.
    pub async fn read_field<T: DeserializeOwned>(
        &self,
        username: &str,
        field: UserDataField,
    ) -> Result<Option<T>> {
        let Some(data) = self.get_user_data(username).await? else {
            return Ok(None);
        };
        data.field(field)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Save a payload field, logging and swallowing any fault.
    pub async fn save_field<T: Serialize + ?Sized>(
        &self,
        username: &str,
        field: UserDataField,
        value: &T,
    ) -> bool {
        match self.update_field(username, field, value).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!(
                    username = %username,
                    field = %field,
                    error = %e,
                    "Failed to save user data"
                );
                false
            }
        }
    }

    /// Read a payload field, logging and swallowing any fault.
    pub async fn get_field<T: DeserializeOwned>(
        &self,
        username: &str,
        field: UserDataField,
    ) -> Option<T> {
        match self.read_field(username, field).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    username = %username,
                    field = %field,
                    error = %e,
                    "Failed to read user data"
                );
                None
            }
        }
    }

    /// Save the weekly meal plan of a user.
    pub async fn save_week_plan(&self, username: &str, plan: &WeekPlan) -> bool {
        self.save_field(username, UserDataField::WeekPlan, plan).await
    }

    /// The weekly meal plan of a user, if one was saved.
    pub async fn get_week_plan(&self, username: &str) -> Option<WeekPlan> {
        self.get_field(username, UserDataField::WeekPlan).await
    }

    /// Save the grocery list of a user.
    pub async fn save_grocery_list(&self, username: &str, list: &GroceryList) -> bool {
        self.save_field(username, UserDataField::GroceryList, list).await
    }

    /// The grocery list of a user, if one was saved.
    pub async fn get_grocery_list(&self, username: &str) -> Option<GroceryList> {
        self.get_field(username, UserDataField::GroceryList).await
    }

    /// Save the food tracking of a user.
    pub async fn save_food_tracking(&self, username: &str, tracking: &FoodTracking) -> bool {
        self.save_field(username, UserDataField::FoodTracking, tracking)
            .await
    }

    /// The food tracking of a user, if one was saved.
    pub async fn get_food_tracking(&self, username: &str) -> Option<FoodTracking> {
        self.get_field(username, UserDataField::FoodTracking).await
    }

    // =========================================================================
    // Current user
    // =========================================================================

    /// The logged-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on engine or decoding faults.
    pub async fn get_current_user(&self) -> Result<Option<SessionUser>> {
        let row = self
            .get_record::<CurrentUserRow>(keys::CURRENT_USER_KEY)
            .await?;
        Ok(row.and_then(|row| row.user))
    }

    /// Replace the current-user row. `None` logs out.
    ///
    /// # Errors
    ///
    /// Returns an error on engine or encoding faults.
    pub async fn set_current_user(&self, user: Option<&SessionUser>) -> Result<bool> {
        let row = CurrentUserRow::new(user.cloned());
        self.put_record(&row).await
    }

    /// Delete the current-user row entirely.
    ///
    /// # Errors
    ///
    /// Returns an error on engine faults.
    pub async fn delete_current_user(&self) -> Result<bool> {
        let Some(engine) = self.engine().await else {
            return Ok(false);
        };
        engine.delete(CurrentUserRow::TABLE, keys::CURRENT_USER_KEY)?;
        Ok(true)
    }
}

/// Serialize a record using CBOR.
fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a record from CBOR.
fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use highchair_core::{FoodCategory, Gender, MealSlot};
    use std::time::Duration;

    fn luna() -> User {
        User::new("Luna", "pass123", Gender::Female)
    }

    async fn memory_store() -> LocalStore {
        let store = LocalStore::open(StoreLocation::Memory);
        assert!(store.ready().await);
        store
    }

    #[tokio::test]
    async fn operations_wait_for_slow_open() {
        let store = LocalStore::open_with(|| {
            std::thread::sleep(Duration::from_millis(50));
            Ok(Arc::new(MemoryEngine::open()?) as Arc<dyn Engine>)
        });
        assert_eq!(store.status(), StoreStatus::Opening);

        // Issued before the engine exists.
        let user = luna();
        let (added, users) = tokio::join!(store.add_user(&user), store.get_users());
        assert!(added.unwrap());
        assert!(users.unwrap().len() <= 1);

        assert_eq!(store.status(), StoreStatus::Ready);
        assert_eq!(store.get_user("Luna").await.unwrap(), Some(luna()));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = memory_store().await;
        assert!(store.add_user(&luna()).await.unwrap());

        let twin = User::new("Luna", "other1", Gender::Male);
        let result = store.add_user(&twin).await;
        assert!(matches!(result, Err(StoreError::UniqueKeyViolation { .. })));

        assert_eq!(store.get_user("Luna").await.unwrap().unwrap().password, "pass123");
        assert!(store.get_user("luna").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_user_data_reads_as_empty_shell() {
        let store = memory_store().await;
        let data = store.get_user_data("Luna").await.unwrap().unwrap();
        assert_eq!(data, UserData::empty("Luna"));
        assert!(store.get_week_plan("Luna").await.is_none());
    }

    #[tokio::test]
    async fn saving_a_field_preserves_the_others() {
        let store = memory_store().await;
        let mut groceries = GroceryList::new();
        groceries.add("leche");
        let tracking = FoodTracking::initial();
        assert!(store.save_grocery_list("Luna", &groceries).await);
        assert!(store.save_food_tracking("Luna", &tracking).await);

        let mut plan = WeekPlan::empty_week();
        plan.set_meal(0, MealSlot::Breakfast, "puré").unwrap();
        assert!(store.save_week_plan("Luna", &plan).await);
        let first = store.get_user_data("Luna").await.unwrap();

        assert!(store.save_week_plan("Luna", &plan).await);
        let second = store.get_user_data("Luna").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.get_week_plan("Luna").await, Some(plan));
        assert_eq!(store.get_grocery_list("Luna").await, Some(groceries));
        assert_eq!(store.get_food_tracking("Luna").await, Some(tracking));
    }

    #[tokio::test]
    async fn concurrent_saves_of_different_fields_both_persist() {
        let store = memory_store().await;
        let mut plan = WeekPlan::default();
        plan.set_meal(3, MealSlot::Lunch, "lentejas").unwrap();
        let mut groceries = GroceryList::new();
        groceries.add("avena");

        let (a, b) = tokio::join!(
            store.save_week_plan("Luna", &plan),
            store.save_grocery_list("Luna", &groceries)
        );
        assert!(a && b);

        assert_eq!(store.get_week_plan("Luna").await, Some(plan));
        assert_eq!(store.get_grocery_list("Luna").await, Some(groceries));
    }

    #[tokio::test]
    async fn row_locks_are_released_after_saves() {
        let store = memory_store().await;
        let plan = WeekPlan::empty_week();
        let groceries = GroceryList::new();

        let (a, b, c) = tokio::join!(
            store.save_week_plan("Luna", &plan),
            store.save_grocery_list("Luna", &groceries),
            store.save_week_plan("Sol", &plan)
        );
        assert!(a && b && c);
        assert!(store.save_user_data("Mar", UserData::empty("Mar")).await.unwrap());

        assert_eq!(store.row_lock_count(), 0);
    }

    #[tokio::test]
    async fn stale_snapshots_are_last_write_wins() {
        let store = memory_store().await;
        assert!(store.save_food_tracking("Luna", &FoodTracking::initial()).await);

        let snapshot_a = store.get_food_tracking("Luna").await.unwrap();
        let snapshot_b = store.get_food_tracking("Luna").await.unwrap();

        let mut with_x = snapshot_a;
        with_x.add_custom(FoodCategory::Frutas, "Maracuyá", &[]);
        assert!(store.save_food_tracking("Luna", &with_x).await);

        let mut with_y = snapshot_b;
        with_y.add_custom(FoodCategory::Frutas, "Granadilla", &[]);
        assert!(store.save_food_tracking("Luna", &with_y).await);

        let stored = store.get_food_tracking("Luna").await.unwrap();
        assert_eq!(stored, with_y);
        let names: Vec<_> = stored
            .foods(FoodCategory::Frutas)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert!(names.contains(&"Granadilla"));
        assert!(!names.contains(&"Maracuyá"));
    }

    #[tokio::test]
    async fn undecodable_field_reads_as_none() {
        let store = memory_store().await;
        assert!(
            store
                .save_field("Luna", UserDataField::WeekPlan, &serde_json::json!({"x": 1}))
                .await
        );
        assert!(store.get_week_plan("Luna").await.is_none());
        assert!(store
            .read_field::<WeekPlan>("Luna", UserDataField::WeekPlan)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn current_user_lifecycle() {
        let store = memory_store().await;
        assert!(store.get_current_user().await.unwrap().is_none());

        let session = luna().session();
        assert!(store.set_current_user(Some(&session)).await.unwrap());
        assert_eq!(store.get_current_user().await.unwrap(), Some(session));

        assert!(store.set_current_user(None).await.unwrap());
        assert!(store.get_current_user().await.unwrap().is_none());

        assert!(store.set_current_user(Some(&luna().session())).await.unwrap());
        assert!(store.delete_current_user().await.unwrap());
        assert!(store.get_current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_engine_degrades_to_defaults() {
        let store = LocalStore::open(StoreLocation::Unavailable);
        assert!(!store.ready().await);
        assert_eq!(store.status(), StoreStatus::Failed);

        assert!(store.get_users().await.unwrap().is_empty());
        assert!(store.get_user("Luna").await.unwrap().is_none());
        assert!(!store.add_user(&luna()).await.unwrap());
        assert!(store.get_user_data("Luna").await.unwrap().is_none());
        assert!(!store
            .save_user_data("Luna", UserData::empty("Luna"))
            .await
            .unwrap());
        assert!(store.get_current_user().await.unwrap().is_none());
        assert!(!store.set_current_user(None).await.unwrap());
        assert!(!store.delete_current_user().await.unwrap());

        assert!(!store.save_week_plan("Luna", &WeekPlan::empty_week()).await);
        assert!(store.get_week_plan("Luna").await.is_none());
        assert!(store.get_grocery_list("Luna").await.is_none());
        assert!(store.get_food_tracking("Luna").await.is_none());
    }

    #[tokio::test]
    async fn panicking_opener_fails_the_store() {
        let store = LocalStore::open_with(|| panic!("engine exploded"));
        assert!(!store.ready().await);
        assert!(store.get_users().await.unwrap().is_empty());
    }

    #[cfg(feature = "rocksdb-backend")]
    #[tokio::test]
    async fn rocks_store_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let location = StoreLocation::Rocks(dir.path().to_path_buf());
        let plan = {
            let mut plan = WeekPlan::default();
            plan.set_meal(0, MealSlot::Breakfast, "puré").unwrap();
            plan
        };

        {
            let store = LocalStore::open(location.clone());
            assert!(store.add_user(&luna()).await.unwrap());
            assert!(store.save_week_plan("Luna", &plan).await);
            assert!(store.set_current_user(Some(&luna().session())).await.unwrap());
        }
        // The open task holds the last engine handle until it finishes.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let store = LocalStore::open(location);
        assert!(store.ready().await);
        assert_eq!(store.get_users().await.unwrap(), vec![luna()]);
        assert_eq!(store.get_week_plan("Luna").await, Some(plan));
        assert_eq!(
            store.get_current_user().await.unwrap(),
            Some(luna().session())
        );
    }
}
