//! Per-user planner state: load on login, save on change.

use std::sync::Arc;

use highchair_core::{FoodTracking, GroceryList, WeekPlan};
use highchair_store::{LocalStore, UserDataField};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Everything the planner screens edit for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerState {
    /// The weekly meal plan.
    pub week_plan: WeekPlan,
    /// The shopping list.
    pub grocery_list: GroceryList,
    /// Tries per food.
    pub food_tracking: FoodTracking,
    // Fields whose stored value could not be decoded. They hold defaults in
    // memory and are not written back until edited.
    preserved: Vec<UserDataField>,
}

impl PlannerState {
    /// Fields loaded as defaults because the stored value was unreadable.
    #[must_use]
    pub fn preserved(&self) -> &[UserDataField] {
        &self.preserved
    }

    fn keeps_stored(&self, field: UserDataField) -> bool {
        self.preserved.contains(&field)
            && match field {
                UserDataField::WeekPlan => self.week_plan.is_empty(),
                UserDataField::GroceryList => self.grocery_list.is_empty(),
                UserDataField::FoodTracking => self.food_tracking == FoodTracking::initial(),
                UserDataField::Settings => true,
            }
    }
}

/// Loads and saves `PlannerState` through the store.
#[derive(Clone)]
pub struct Planner {
    store: Arc<LocalStore>,
}

impl Planner {
    /// Create a planner over a store.
    #[must_use]
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// Load a user's state, initialising and saving whatever is missing.
    ///
    /// A missing week plan becomes seven empty days, a missing grocery list
    /// becomes empty and missing food tracking becomes the built-in catalogue.
    /// A stored value that cannot be decoded is replaced by its default in
    /// memory only; the stored row is left untouched.
    pub async fn load(&self, username: &str) -> PlannerState {
        let mut preserved = Vec::new();
        let week_plan = self
            .load_field(username, UserDataField::WeekPlan, WeekPlan::empty_week, &mut preserved)
            .await;
        let grocery_list = self
            .load_field(username, UserDataField::GroceryList, GroceryList::new, &mut preserved)
            .await;
        let food_tracking = self
            .load_field(
                username,
                UserDataField::FoodTracking,
                FoodTracking::initial,
                &mut preserved,
            )
            .await;

        tracing::debug!(username = %username, "Loaded planner state");
        PlannerState {
            week_plan,
            grocery_list,
            food_tracking,
            preserved,
        }
    }

    async fn load_field<T, F>(
        &self,
        username: &str,
        field: UserDataField,
        initial: F,
        preserved: &mut Vec<UserDataField>,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.store.read_field(username, field).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                let value = initial();
                self.store.save_field(username, field, &value).await;
                value
            }
            Err(e) => {
                tracing::warn!(
                    username = %username,
                    field = %field,
                    error = %e,
                    "Unreadable user data, using defaults without overwriting"
                );
                preserved.push(field);
                initial()
            }
        }
    }

    /// Save all three parts of a user's state. `true` if every part persisted.
    ///
    /// Parts loaded from unreadable data are skipped until they are edited.
    pub async fn save(&self, username: &str, state: &PlannerState) -> bool {
        let (week, groceries, tracking) = futures::future::join3(
            self.save_part(username, state, UserDataField::WeekPlan, &state.week_plan),
            self.save_part(username, state, UserDataField::GroceryList, &state.grocery_list),
            self.save_part(username, state, UserDataField::FoodTracking, &state.food_tracking),
        )
        .await;

        let saved = week && groceries && tracking;
        if saved {
            tracing::debug!(username = %username, "Saved planner state");
        } else {
            tracing::warn!(username = %username, "Planner state was not fully saved");
        }
        saved
    }

    async fn save_part<T: Serialize>(
        &self,
        username: &str,
        state: &PlannerState,
        field: UserDataField,
        value: &T,
    ) -> bool {
        if state.keeps_stored(field) {
            tracing::debug!(
                username = %username,
                field = %field,
                "Keeping unreadable stored value"
            );
            return true;
        }
        self.store.save_field(username, field, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use highchair_core::{FoodCategory, MealSlot};
    use highchair_store::{StoreLocation, UserData};

    async fn planner() -> (Planner, Arc<LocalStore>) {
        let store = Arc::new(LocalStore::open(StoreLocation::Memory));
        assert!(store.ready().await);
        (Planner::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn first_load_initialises_and_persists() {
        let (planner, store) = planner().await;
        let state = planner.load("Luna").await;

        assert_eq!(state.week_plan, WeekPlan::empty_week());
        assert!(state.grocery_list.is_empty());
        assert_eq!(state.food_tracking, FoodTracking::initial());

        assert_eq!(store.get_week_plan("Luna").await, Some(WeekPlan::empty_week()));
        assert_eq!(store.get_food_tracking("Luna").await, Some(FoodTracking::initial()));
    }

    #[tokio::test]
    async fn saved_state_is_loaded_back() {
        let (planner, _) = planner().await;
        let mut state = planner.load("Luna").await;

        state.week_plan.set_meal(4, MealSlot::Dinner, "crema de zapallo").unwrap();
        state.grocery_list.add("bananos");
        assert!(state.food_tracking.increment(FoodCategory::Frutas, "f3"));
        assert!(planner.save("Luna", &state).await);

        assert_eq!(planner.load("Luna").await, state);
    }

    #[tokio::test]
    async fn degraded_store_still_yields_defaults() {
        let store = Arc::new(LocalStore::open(StoreLocation::Unavailable));
        let planner = Planner::new(store);

        let state = planner.load("Luna").await;
        assert_eq!(state.food_tracking, FoodTracking::initial());
        assert!(!planner.save("Luna", &state).await);
    }

    #[tokio::test]
    async fn unreadable_week_plan_is_not_overwritten() {
        let (planner, store) = planner().await;
        // Day 7 is outside the week, so the plan does not decode.
        let stored = serde_json::json!({"0": {"lunch": "arroz"}, "7": {"breakfast": "puré"}});
        let mut data = UserData::empty("Luna");
        data.set_field(UserDataField::WeekPlan, stored.clone());
        assert!(store.save_user_data("Luna", data).await.unwrap());

        let mut state = planner.load("Luna").await;
        assert_eq!(state.week_plan, WeekPlan::empty_week());
        assert_eq!(state.preserved(), &[UserDataField::WeekPlan]);
        assert_eq!(state.food_tracking, FoodTracking::initial());

        let raw = |data: Option<UserData>| {
            data.and_then(|data| data.field(UserDataField::WeekPlan).cloned())
        };
        assert_eq!(raw(store.get_user_data("Luna").await.unwrap()), Some(stored.clone()));

        // Saving other parts leaves the stored plan alone.
        state.grocery_list.add("arroz");
        assert!(planner.save("Luna", &state).await);
        assert_eq!(raw(store.get_user_data("Luna").await.unwrap()), Some(stored));
        assert_eq!(store.get_grocery_list("Luna").await, Some(state.grocery_list.clone()));

        // Once edited, the new plan replaces it.
        state.week_plan.set_meal(1, MealSlot::Lunch, "quinoa").unwrap();
        assert!(planner.save("Luna", &state).await);
        assert_eq!(store.get_week_plan("Luna").await, Some(state.week_plan));
    }
}
