//! End-to-end planner flows: signup, login, editing and restart.

mod common;

use common::{TestHarness, TEST_DEBOUNCE};
use highchair_core::{
    FoodCategory, FoodTag, FoodTracking, Gender, MealSlot, PlannerError, WeekPlan,
};

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn luna_keeps_her_week_plan_across_logins() {
    let harness = TestHarness::new().await;
    let auth = &harness.state.auth;
    let store = &harness.state.store;

    auth.signup("Luna", "pass123", Gender::Female).await.unwrap();
    auth.logout().await.unwrap();

    let session = auth.login("Luna", "pass123").await.unwrap();
    assert_eq!(session.username, "Luna");
    assert_eq!(session.gender, Gender::Female);

    let mut plan = WeekPlan::default();
    plan.set_meal(0, MealSlot::Breakfast, "puré").unwrap();
    assert!(store.save_week_plan("Luna", &plan).await);

    auth.logout().await.unwrap();
    assert!(store.get_current_user().await.unwrap().is_none());

    auth.login("Luna", "pass123").await.unwrap();
    assert_eq!(store.get_week_plan("Luna").await, Some(plan));
}

#[tokio::test]
async fn unknown_login_creates_nothing() {
    let harness = TestHarness::new().await;
    let store = &harness.state.store;

    let result = harness.state.auth.login("Nadie", "pass123").await;
    assert_eq!(
        result,
        Err(PlannerError::UserNotFound {
            username: "Nadie".into()
        })
    );

    assert!(store.get_users().await.unwrap().is_empty());
    assert!(store.get_current_user().await.unwrap().is_none());
    assert!(store.get_week_plan("Nadie").await.is_none());
}

#[tokio::test]
async fn errors_carry_user_facing_messages() {
    let harness = TestHarness::new().await;
    let auth = &harness.state.auth;

    let err = auth.login("", "").await.unwrap_err();
    assert_eq!(err.to_string(), "please enter a name and a password");

    let err = auth.signup("Luna", "abc12", Gender::Female).await.unwrap_err();
    assert_eq!(err.to_string(), "the password must be at least 6 characters long");
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn new_user_session_starts_from_defaults() {
    let harness = TestHarness::new().await;
    let user = harness
        .state
        .auth
        .signup("Sol", "abc123", Gender::Male)
        .await
        .unwrap();

    let session = harness.state.start_session(user).await;
    assert!(session.state().week_plan.is_empty());
    assert!(session.state().grocery_list.is_empty());
    assert_eq!(session.state().food_tracking, FoodTracking::initial());

    // The catalogue is written back on first load.
    assert_eq!(
        harness.state.store.get_food_tracking("Sol").await,
        Some(FoodTracking::initial())
    );
}

#[tokio::test]
async fn edits_are_autosaved_after_quiet_period() {
    let harness = TestHarness::new().await;
    let user = harness
        .state
        .auth
        .signup("Luna", "pass123", Gender::Female)
        .await
        .unwrap();
    let mut session = harness.state.start_session(user).await;

    session.edit(|state| {
        state.food_tracking.increment(FoodCategory::Proteinas, "p2");
        state
            .food_tracking
            .add_custom(FoodCategory::Frutas, "Maracuyá", &[FoodTag::VitaminaC]);
    });
    let expected = session.state().food_tracking.clone();

    tokio::time::sleep(TEST_DEBOUNCE * 3).await;
    assert_eq!(
        harness.state.store.get_food_tracking("Luna").await,
        Some(expected)
    );
}

#[tokio::test]
async fn ending_a_session_saves_and_logs_out() {
    let harness = TestHarness::new().await;
    let state = &harness.state;
    let user = state.auth.signup("Luna", "pass123", Gender::Female).await.unwrap();

    let mut session = state.start_session(user).await;
    session.edit(|planner| {
        planner.grocery_list.add("leche de fórmula");
        planner
            .week_plan
            .set_meal(2, MealSlot::Lunch, "lentejas")
            .unwrap();
    });
    let expected = session.state().clone();
    session.end(&state.auth).await.unwrap();

    assert!(state.store.get_current_user().await.unwrap().is_none());
    assert_eq!(state.store.get_grocery_list("Luna").await, Some(expected.grocery_list));
    assert_eq!(state.store.get_week_plan("Luna").await, Some(expected.week_plan));
}

// ============================================================================
// Restart
// ============================================================================

#[cfg(feature = "rocksdb-backend")]
#[tokio::test]
async fn session_and_data_survive_restart() {
    let harness = TestHarness::new().await;
    let user = harness
        .state
        .auth
        .signup("Luna", "pass123", Gender::Female)
        .await
        .unwrap();
    let mut session = harness.state.start_session(user).await;
    session.edit(|planner| {
        planner
            .week_plan
            .set_meal(0, MealSlot::Breakfast, "puré")
            .unwrap();
    });
    assert!(session.save_now().await);
    let expected = session.state().clone();
    drop(session);

    let harness = harness.reboot().await;
    let restored = harness.current_user.clone().expect("session restored");
    assert_eq!(restored.username, "Luna");

    let session = harness.state.start_session(restored).await;
    assert_eq!(session.state(), &expected);
}
