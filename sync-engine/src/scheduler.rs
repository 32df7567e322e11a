//! Delay scheduling for the scheduled strategy.
//!
//! The strategy computes how long to wait and hands the wait to a
//! [`DelayScheduler`], so tests and the demo can skip real sleeping.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

/// Waits for a given duration.
#[async_trait]
pub trait DelayScheduler: Send + Sync {
    /// Complete after `duration`.
    async fn delay(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl DelayScheduler for TokioScheduler {
    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and records each requested delay.
#[derive(Debug, Clone, Default)]
pub struct InstantScheduler {
    requested: Arc<Mutex<Vec<Duration>>>,
}

impl InstantScheduler {
    /// Create a scheduler with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, oldest first.
    pub fn requested(&self) -> Vec<Duration> {
        self.requested
            .lock()
            .map(|requested| requested.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DelayScheduler for InstantScheduler {
    async fn delay(&self, duration: Duration) {
        tracing::debug!("Skipping scheduled delay of {:?}", duration);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn instant_scheduler_records() {
        let scheduler = InstantScheduler::new();
        scheduler.delay(Duration::from_secs(5)).await;
        scheduler.delay(Duration::from_secs(12)).await;
        assert_eq!(
            scheduler.requested(),
            vec![Duration::from_secs(5), Duration::from_secs(12)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_sleeps() {
        let start = tokio::time::Instant::now();
        TokioScheduler.delay(Duration::from_secs(30)).await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
