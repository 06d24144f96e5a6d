//! Periodic removal of expired sessions.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Spawn a task that deletes expired sessions every `period`. Failures
/// are logged and the next tick tries again.
pub fn spawn_session_sweeper(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match state.auth.sweep_expired().await {
                Ok(0) => debug!("no expired sessions"),
                Ok(removed) => info!(removed, "expired sessions swept"),
                Err(e) => warn!(error = %e, "session sweep failed"),
            }
        }
    })
}
