//! State sync background task.
//!
//! Periodically reloads the authoritative records so this instance's
//! observers converge on commits made by other instances sharing the
//! backend. The same round trip doubles as the store reachability check
//! behind `/ready`.
//!
//! # Graceful Shutdown
//!
//! Exits when the cancellation token is triggered, after finishing the
//! current iteration.

use crate::coordinator::ClickCoordinator;
use crate::observability::metrics::set_observers_active;
use crate::observability::HealthState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the sync loop until cancelled.
pub async fn run_state_sync(
    coordinator: Arc<ClickCoordinator>,
    health: Arc<HealthState>,
    sync_interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "click.sync",
        interval_ms = u64::try_from(sync_interval.as_millis()).unwrap_or(u64::MAX),
        "State sync task started"
    );

    let mut interval = tokio::time::interval(sync_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sync_once(&coordinator, &health).await;
            }
            () = cancel_token.cancelled() => {
                info!(target: "click.sync", "State sync task received shutdown signal, exiting");
                break;
            }
        }
    }
}

async fn sync_once(coordinator: &ClickCoordinator, health: &HealthState) {
    match coordinator.sync_from_store().await {
        Ok(_) => health.set_store_reachable(true),
        Err(e) if e.is_retryable() => {
            health.set_store_reachable(false);
            warn!(target: "click.sync", error = %e, "State sync failed, store unreachable");
        }
        Err(e) => {
            health.set_store_reachable(false);
            error!(target: "click.sync", error = %e, "State sync found invalid stored state");
        }
    }

    let bus = coordinator.bus();
    set_observers_active("counter", bus.counter_observers());
    set_observers_active("winner", bus.winner_observers());
}
