//! Persisted record shapes.
//!
//! Each record type names its table and exposes its primary key. Planner
//! payloads are kept as JSON values so the store stays agnostic of the
//! domain types layered on top of it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use highchair_core::{SessionUser, User};

use crate::keys;
use crate::schema::table;

/// A value stored in one of the record tables.
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// The table holding records of this type.
    const TABLE: &'static str;

    /// The primary key of this record.
    fn key(&self) -> &str;
}

impl Record for User {
    const TABLE: &'static str = table::USERS;

    fn key(&self) -> &str {
        &self.username
    }
}

/// Per-user planner data. Every payload field is optional and opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Owner of the row; foreign reference to `users`, not enforced.
    pub username: String,

    /// Weekly meal plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_plan: Option<Value>,

    /// Grocery list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grocery_list: Option<Value>,

    /// Foods tried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_tracking: Option<Value>,

    /// UI settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl UserData {
    /// An empty row for a user.
    #[must_use]
    pub fn empty(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Read one payload field.
    #[must_use]
    pub fn field(&self, field: UserDataField) -> Option<&Value> {
        match field {
            UserDataField::WeekPlan => self.week_plan.as_ref(),
            UserDataField::GroceryList => self.grocery_list.as_ref(),
            UserDataField::FoodTracking => self.food_tracking.as_ref(),
            UserDataField::Settings => self.settings.as_ref(),
        }
    }

    /// Overlay one payload field, leaving the others untouched.
    pub fn set_field(&mut self, field: UserDataField, value: Value) {
        let slot = match field {
            UserDataField::WeekPlan => &mut self.week_plan,
            UserDataField::GroceryList => &mut self.grocery_list,
            UserDataField::FoodTracking => &mut self.food_tracking,
            UserDataField::Settings => &mut self.settings,
        };
        *slot = (!value.is_null()).then_some(value);
    }
}

impl Record for UserData {
    const TABLE: &'static str = table::USER_DATA;

    fn key(&self) -> &str {
        &self.username
    }
}

/// The payload fields of a `UserData` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserDataField {
    /// `weekPlan`.
    WeekPlan,
    /// `groceryList`.
    GroceryList,
    /// `foodTracking`.
    FoodTracking,
    /// `settings`.
    Settings,
}

impl UserDataField {
    /// Fields carried over from the legacy flat-key area, in migration order.
    pub const LEGACY: [Self; 3] = [Self::WeekPlan, Self::GroceryList, Self::FoodTracking];

    /// The persisted field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WeekPlan => "weekPlan",
            Self::GroceryList => "groceryList",
            Self::FoodTracking => "foodTracking",
            Self::Settings => "settings",
        }
    }
}

impl std::fmt::Display for UserDataField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The singleton row of the `currentUser` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserRow {
    /// Always `keys::CURRENT_USER_KEY`.
    pub id: String,

    /// The logged-in user, or `None` when logged out.
    pub user: Option<SessionUser>,
}

impl CurrentUserRow {
    /// Build the row for a session (or a logout).
    #[must_use]
    pub fn new(user: Option<SessionUser>) -> Self {
        Self {
            id: keys::CURRENT_USER_KEY.to_string(),
            user,
        }
    }
}

impl Record for CurrentUserRow {
    const TABLE: &'static str = table::CURRENT_USER;

    fn key(&self) -> &str {
        &self.id
    }
}
