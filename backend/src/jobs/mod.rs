//! Periodic background jobs
//!
//! Two independent timer-driven tasks share the persistent store: the global
//! reservation-expiry sweep and the recurring-schedule runner. Each tick owns
//! its failure boundary; an error is logged and the loop continues.

use std::time::Duration;

use crate::AppState;

/// Spawn the background jobs. Called once at startup.
pub fn spawn(state: AppState) {
    spawn_inventory_sweep(state.clone());
    spawn_schedule_runner(state);
}

fn spawn_inventory_sweep(state: AppState) {
    let period = Duration::from_secs(state.config.inventory.sweep_interval_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match state.inventory_service().sweep_all_expired().await {
                Ok(0) => tracing::debug!("inventory sweep: nothing to expire"),
                Ok(n) => tracing::info!("inventory sweep expired {n} reservations"),
                Err(err) => tracing::error!("inventory sweep failed: {err}"),
            }
        }
    });
}

fn spawn_schedule_runner(state: AppState) {
    let period = Duration::from_secs(state.config.scheduler.tick_interval_seconds);
    let batch_size = state.config.scheduler.batch_size;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let orders = state.order_service();
            match state
                .schedule_service()
                .run_due_schedules(&orders, batch_size)
                .await
            {
                Ok(report) if report.scanned == 0 => {
                    tracing::debug!("schedule tick: nothing due");
                }
                Ok(report) => tracing::info!(
                    scanned = report.scanned,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "schedule tick complete"
                ),
                Err(err) => tracing::error!("schedule tick failed: {err}"),
            }
        }
    });
}
