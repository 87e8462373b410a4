//! notewall state - the rate-limit ledger and everything that touches it.
//!
//! The ledger maps a visitor identity to the epoch-millisecond timestamps of
//! its recent posts. It lives in process memory, so several server instances
//! each enforce the limit on their own; swap in another [`LedgerStore`] to
//! share it.

pub mod clock;
pub mod ledger;
pub mod limiter;
pub mod reclaimer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{LedgerStore, MemoryLedger};
pub use limiter::{Decision, RateLimitConfig, RateLimiter, MIN_RETRY_AFTER_MS};
pub use reclaimer::{Reclaimer, ReclaimerHandle};
