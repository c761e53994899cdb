//! Per-key admission algorithms
//!
//! An [`Algorithm`] is the state machine that decides, for a single key,
//! whether the next request may proceed. The store and the coordinator only
//! ever talk to this trait, so another algorithm can be dropped in without
//! touching either of them. [`TokenBucket`] is the one implementation shipped.

use std::time::Instant;

mod token_bucket;


pub use token_bucket::TokenBucket;

/// Decision capability shared by every per-key limiter state
///
/// Implementations guard their own state, so `&self` methods may be called
/// from many threads at once. Calls for the same instance must be
/// linearizable: the sequence of decisions is consistent with some serial
/// order of the calls.
///
/// The `_at` variants take the current instant explicitly, which keeps the
/// arithmetic deterministic in tests. The plain variants read the monotonic
/// clock.
pub trait Algorithm: Send + Sync {
    /// Consume one unit of capacity at `now` if available
    ///
    /// Returns `true` if the request is allowed, `false` if it is blocked.
    fn try_consume_at(&self, now: Instant) -> bool;

    /// Current capacity level at `now`, without consuming anything
    fn peek_level_at(&self, now: Instant) -> f64;

    /// Consume one unit of capacity using the monotonic clock
    fn try_consume(&self) -> bool {
        self.try_consume_at(Instant::now())
    }

    /// Current capacity level using the monotonic clock
    fn peek_level(&self) -> f64 {
        self.peek_level_at(Instant::now())
    }
}
