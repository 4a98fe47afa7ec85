//! Boot-time legacy migration tests.

mod common;

use common::TestHarness;
use highchair_core::{Gender, MealSlot, PlannerError};
use highchair_store::MigrationOutcome;

const USERS: &str = r#"[{"username":"Luna","password":"pass123","gender":"female"}]"#;
const CURRENT: &str = r#"{"username":"Luna","gender":"female"}"#;
const WEEK_PLAN: &str = r#"{"0":{"breakfast":"puré"}}"#;

#[tokio::test]
async fn fresh_install_has_nothing_to_migrate() {
    let harness = TestHarness::new().await;
    assert_eq!(harness.migration, MigrationOutcome::Completed);
    assert!(harness.current_user.is_none());
    assert_eq!(
        harness.legacy_items().get("dbMigrationCompleted").map(String::as_str),
        Some("true")
    );
}

#[tokio::test]
async fn legacy_data_is_imported_at_boot() {
    let harness = TestHarness::with_legacy(&[
        ("users", USERS),
        ("user", CURRENT),
        ("weekPlan_Luna", WEEK_PLAN),
    ])
    .await;

    assert_eq!(harness.migration, MigrationOutcome::Completed);
    let current = harness.current_user.clone().expect("current user migrated");
    assert_eq!(current.username, "Luna");
    assert_eq!(current.gender, Gender::Female);

    // Migrated credentials work.
    harness.state.auth.login("Luna", "pass123").await.unwrap();

    let session = harness.state.start_session(current).await;
    assert_eq!(session.state().week_plan.meal(0, MealSlot::Breakfast), "puré");
}

#[cfg(feature = "rocksdb-backend")]
#[tokio::test]
async fn migration_runs_only_once() {
    let harness = TestHarness::with_legacy(&[("users", USERS)]).await;
    assert_eq!(harness.migration, MigrationOutcome::Completed);

    let harness = harness.reboot().await;
    assert_eq!(harness.migration, MigrationOutcome::Skipped);
    assert_eq!(harness.state.store.get_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_migration_is_not_retried() {
    let harness = TestHarness::with_legacy(&[("users", "not json"), ("user", CURRENT)]).await;

    assert_eq!(
        harness.migration,
        MigrationOutcome::Failed { flagged: true }
    );
    assert!(harness.current_user.is_none());
    assert!(harness.legacy_items().contains_key("dbMigrationCompleted"));
}

#[tokio::test]
async fn malformed_legacy_file_does_not_block_boot() {
    let harness = TestHarness::with_legacy_file(r#"{"users": [1,2]"#).await;

    assert_eq!(
        harness.migration,
        MigrationOutcome::Failed { flagged: false }
    );
    assert!(harness.current_user.is_none());

    // The store is usable without the legacy data.
    let auth = &harness.state.auth;
    auth.signup("Luna", "pass123", Gender::Female).await.unwrap();
    assert_eq!(
        auth.signup("Luna", "pass123", Gender::Female).await,
        Err(PlannerError::UsernameTaken {
            username: "Luna".into()
        })
    );

    // The unreadable file is left alone.
    let contents =
        std::fs::read_to_string(harness.temp_dir.path().join("legacy.json")).unwrap();
    assert_eq!(contents, r#"{"users": [1,2]"#);
}
