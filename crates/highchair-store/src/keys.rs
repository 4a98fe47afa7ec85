//! Key names for the store and the legacy flat-key area.

use crate::records::UserDataField;

/// Sentinel primary key of the singleton `currentUser` row.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Keys of the legacy flat-key area.
pub mod legacy {
    /// Serialized array of user records.
    pub const USERS: &str = "users";

    /// Serialized current-user record.
    pub const CURRENT_USER: &str = "user";

    /// Set once migration has been attempted.
    pub const MIGRATION_FLAG: &str = "dbMigrationCompleted";

    /// Value written under `MIGRATION_FLAG`.
    pub const MIGRATION_FLAG_VALUE: &str = "true";
}

/// Legacy key of a per-user blob: `<field>_<username>`.
#[must_use]
pub fn legacy_field_key(field: UserDataField, username: &str) -> String {
    format!("{}_{username}", field.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_field_keys() {
        assert_eq!(legacy_field_key(UserDataField::WeekPlan, "Luna"), "weekPlan_Luna");
        assert_eq!(
            legacy_field_key(UserDataField::GroceryList, "Luna"),
            "groceryList_Luna"
        );
        assert_eq!(
            legacy_field_key(UserDataField::FoodTracking, "luna_2"),
            "foodTracking_luna_2"
        );
    }
}
