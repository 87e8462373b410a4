//! Storage behind the rate limiter.

use dashmap::DashMap;

/// Per-identity action timestamps.
///
/// Every method is one atomic step for the identity it touches: a prune and
/// append in [`append`](LedgerStore::append), or a prune and possible removal
/// per entry in [`sweep`](LedgerStore::sweep), never interleaves with another
/// call on the same identity.
pub trait LedgerStore: Send + Sync {
    /// Timestamps for `identity` newer than `window_start`. Does not write.
    fn active(&self, identity: &str, window_start: u64) -> Vec<u64>;

    /// Drop timestamps at or before `window_start`, then append `at`.
    fn append(&self, identity: &str, window_start: u64, at: u64);

    /// Prune every entry and remove the ones left empty.
    /// Returns how many identities were removed.
    fn sweep(&self, window_start: u64) -> usize;

    /// Number of identities with an entry.
    fn tracked(&self) -> usize;

    fn is_tracked(&self, identity: &str) -> bool;
}

/// In-process ledger on a sharded concurrent map. Each shard lock covers the
/// read-modify-write of a single entry.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: DashMap<String, Vec<u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedger {
    fn active(&self, identity: &str, window_start: u64) -> Vec<u64> {
        self.entries
            .get(identity)
            .map(|ts| ts.iter().copied().filter(|&t| t > window_start).collect())
            .unwrap_or_default()
    }

    fn append(&self, identity: &str, window_start: u64, at: u64) {
        let mut entry = self.entries.entry(identity.to_string()).or_default();
        let timestamps = entry.value_mut();
        timestamps.retain(|&t| t > window_start);
        timestamps.push(at);
    }

    fn sweep(&self, window_start: u64) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, timestamps| {
            timestamps.retain(|&t| t > window_start);
            let keep = !timestamps.is_empty();
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn tracked(&self) -> usize {
        self.entries.len()
    }

    fn is_tracked(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }
}
