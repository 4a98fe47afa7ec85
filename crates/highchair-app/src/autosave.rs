//! Debounced background saving of planner state.
//!
//! Every edit hands the latest `PlannerState` to the `AutoSaver`. The
//! background task keeps only the newest snapshot and saves it once no newer
//! one has arrived for the debounce period.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::planner::{Planner, PlannerState};

enum Command {
    Snapshot {
        username: String,
        state: Box<PlannerState>,
    },
    Flush(oneshot::Sender<bool>),
}

/// Handle to the auto-save task.
///
/// Dropping the handle closes the channel; the task then saves any pending
/// snapshot and exits.
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl AutoSaver {
    /// Spawn the auto-save task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn spawn(planner: Planner, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(planner, debounce, rx));
        Self { tx, task }
    }

    /// Queue a snapshot, replacing any snapshot still waiting.
    pub fn schedule(&self, username: &str, state: PlannerState) {
        let command = Command::Snapshot {
            username: username.to_string(),
            state: Box::new(state),
        };
        if self.tx.send(command).is_err() {
            tracing::warn!(username = %username, "Auto-save task is gone, snapshot dropped");
        }
    }

    /// Save the pending snapshot now. `true` if there was nothing to save or
    /// it was saved.
    pub async fn flush(&self) -> bool {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Flush(reply)).is_err() {
            return false;
        }
        done.await.unwrap_or(false)
    }

    /// Save the pending snapshot and stop the task.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Auto-save task failed");
        }
    }
}

async fn run(planner: Planner, debounce: Duration, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut pending: Option<(String, Box<PlannerState>)> = None;

    loop {
        let command = if pending.is_some() {
            tokio::select! {
                command = rx.recv() => command,
                () = tokio::time::sleep(debounce) => {
                    save_pending(&planner, &mut pending).await;
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(Command::Snapshot { username, state }) => {
                // A different user's snapshot must not replace an unsaved one.
                if pending.as_ref().is_some_and(|(current, _)| *current != username) {
                    save_pending(&planner, &mut pending).await;
                }
                pending = Some((username, state));
            }
            Some(Command::Flush(reply)) => {
                let saved = save_pending(&planner, &mut pending).await;
                // The caller may have stopped waiting.
                let _ = reply.send(saved);
            }
            None => {
                save_pending(&planner, &mut pending).await;
                tracing::debug!("Auto-save task stopped");
                return;
            }
        }
    }
}

async fn save_pending(
    planner: &Planner,
    pending: &mut Option<(String, Box<PlannerState>)>,
) -> bool {
    match pending.take() {
        Some((username, state)) => planner.save(&username, &state).await,
        None => true,
    }
}
