//! Background reconciliation task.
//!
//! Runs periodically to merge the local store's pending files into the
//! orchestrator's queue.

use std::time::Duration;

use tokio::time::{interval_at, Instant};

use crate::config::ReconcileConfig;
use crate::orchestrator::WeakOrchestrator;

/// Spawn a background reconciliation task.
///
/// The first pass runs one interval after spawning. The task holds only a
/// weak reference and exits once the orchestrator is gone. Returns a handle
/// that can be used to abort the task.
pub fn spawn_reconcile_task(
    orchestrator: WeakOrchestrator,
    config: ReconcileConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Reconciliation task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Reconciliation task started (interval: {}s)", interval_secs);

        let period = Duration::from_secs(interval_secs);
        let mut timer = interval_at(Instant::now() + period, period);

        loop {
            timer.tick().await;

            let Some(orchestrator) = orchestrator.upgrade() else {
                tracing::debug!("Orchestrator dropped, stopping reconciliation");
                return;
            };

            match orchestrator.reconcile().await {
                Ok(queued) => {
                    if queued > 0 {
                        tracing::info!("Reconcile: queued {} pending files", queued);
                    } else {
                        tracing::debug!("Reconcile: nothing new to queue");
                    }
                }
                Err(e) => {
                    tracing::error!("Reconcile error: {}", e);
                }
            }
        }
    })
}
