//! Background sweep that keeps the ledger from growing without bound.
//!
//! Purely a memory optimization: `check` and `record` prune on access, so
//! the limiter is correct whether or not the sweep ever runs.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::RateLimiter;

pub struct Reclaimer {
    limiter: RateLimiter,
    interval: Duration,
}

impl Reclaimer {
    pub fn new(limiter: RateLimiter, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Reclaimer using the limiter's configured sweep interval.
    pub fn from_limiter(limiter: RateLimiter) -> Self {
        let interval = Duration::from_millis(limiter.config().reclaim_interval_ms);
        Self::new(limiter, interval)
    }

    /// Run one sweep now. Returns the number of identities removed.
    pub fn sweep_once(&self) -> usize {
        let removed = self.limiter.reclaim();
        tracing::debug!(removed, tracked = self.limiter.tracked(), "Rate-limit ledger swept");
        removed
    }

    /// Sweep on a fixed interval until the returned handle is shut down or
    /// dropped. Must be called from within a tokio runtime.
    pub fn spawn(self) -> ReclaimerHandle {
        let period = self.interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing to reclaim yet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep_once();
            }
        });
        tracing::info!(interval_ms = period.as_millis() as u64, "Ledger reclaimer started");
        ReclaimerHandle { task: Some(task) }
    }
}

/// Owns the sweep task. Dropping it stops the sweep.
pub struct ReclaimerHandle {
    task: Option<JoinHandle<()>>,
}

impl ReclaimerHandle {
    /// Stop the sweep and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ReclaimerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
