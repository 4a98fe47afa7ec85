//! Highchair - weekly meal planning for a baby's first foods
//!
//! This binary boots the application and reports what it found.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use highchair_app::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,highchair=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Highchair");

    let config = AppConfig::from_env()?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        autosave_ms = %config.autosave_debounce.as_millis(),
        retry_failed_migration = %config.retry_failed_migration,
        "Configuration loaded"
    );

    let booted = AppState::boot(config).await;
    let state = &booted.state;

    let users = state.store.get_users().await?;
    tracing::info!(
        store = ?state.store_status(),
        migration = ?booted.migration,
        users = users.len(),
        "Store ready"
    );

    if let Some(user) = booted.current_user {
        let session = state.start_session(user).await;
        let planner = session.state();
        tracing::info!(
            username = %session.user().username,
            planned_days = planner.week_plan.days().filter(|(_, day)| !day.is_empty()).count(),
            groceries_pending = planner.grocery_list.pending().count(),
            food_tries = planner.food_tracking.total_tries(),
            "Session restored"
        );
        session.save_now().await;
    }

    Ok(())
}
