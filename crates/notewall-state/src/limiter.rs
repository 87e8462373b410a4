//! Sliding-window admission control, one window per visitor identity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Clock, LedgerStore, MemoryLedger, SystemClock};

pub const DEFAULT_WINDOW_MS: u64 = 5 * 60 * 1000;      // 5 minutes
pub const DEFAULT_MAX_ACTIONS: u32 = 10;
pub const DEFAULT_RECLAIM_INTERVAL_MS: u64 = 10 * 60 * 1000; // 10 minutes

/// Lower bound on the retry hint handed to denied callers.
pub const MIN_RETRY_AFTER_MS: u64 = 1_000;

/// Retry hint used for `Retry-After` when a denial carries none.
const FALLBACK_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Width of the sliding window.
    pub window_ms: u64,
    /// Actions allowed inside one window.
    pub max_actions: u32,
    /// How often the reclaimer sweeps the ledger.
    pub reclaim_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_actions: DEFAULT_MAX_ACTIONS,
            reclaim_interval_ms: DEFAULT_RECLAIM_INTERVAL_MS,
        }
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl Decision {
    fn allow(remaining: u32) -> Self {
        Self { allowed: true, remaining, retry_after_ms: None }
    }

    fn deny(retry_after_ms: u64) -> Self {
        Self { allowed: false, remaining: 0, retry_after_ms: Some(retry_after_ms) }
    }

    /// Retry hint in whole seconds, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_ms
            .map(|ms| ms.div_ceil(1_000))
            .unwrap_or(FALLBACK_RETRY_AFTER_SECS)
    }
}

/// Per-identity sliding-window rate limiter.
///
/// [`check`](Self::check) never consumes quota; only [`record`](Self::record)
/// does, and callers must invoke it once per action that actually persisted.
/// Cloning shares the same ledger.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked", &self.store.tracked())
            .finish()
    }
}

impl RateLimiter {
    /// In-memory ledger on the wall clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_parts(config, Arc::new(MemoryLedger::new()), Arc::new(SystemClock))
    }

    pub fn with_parts(
        config: RateLimitConfig,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { config, store, clock }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn window_start(&self, now: u64) -> u64 {
        now.saturating_sub(self.config.window_ms)
    }

    /// Would an action by `identity` be admitted right now?
    pub fn check(&self, identity: &str) -> Decision {
        let now = self.clock.now_ms();
        let active = self.store.active(identity, self.window_start(now));
        let count = u32::try_from(active.len()).unwrap_or(u32::MAX);

        if count >= self.config.max_actions {
            // Time until the oldest in-window action ages out.
            let oldest = active.iter().copied().min().unwrap_or(now);
            let retry_after = (oldest + self.config.window_ms)
                .saturating_sub(now)
                .max(MIN_RETRY_AFTER_MS);
            tracing::debug!(count, retry_after_ms = retry_after, "Rate limit reached");
            return Decision::deny(retry_after);
        }

        Decision::allow(self.config.max_actions - count)
    }

    /// Consume one slot for `identity`. Call only after the action committed.
    pub fn record(&self, identity: &str) {
        let now = self.clock.now_ms();
        self.store.append(identity, self.window_start(now), now);
    }

    /// Prune the whole ledger, dropping identities with nothing left in the
    /// window. Returns the number of identities removed.
    pub fn reclaim(&self) -> usize {
        let now = self.clock.now_ms();
        self.store.sweep(self.window_start(now))
    }

    pub fn tracked(&self) -> usize {
        self.store.tracked()
    }

    pub fn is_tracked(&self, identity: &str) -> bool {
        self.store.is_tracked(identity)
    }
}
