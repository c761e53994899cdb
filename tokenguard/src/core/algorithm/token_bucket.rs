use super::Algorithm;
use crate::core::{ConfigError, validate_bucket};
use parking_lot::Mutex;
use std::time::Instant;

/// Classic token bucket
///
/// The bucket holds up to `capacity` tokens and starts full. Tokens flow back
/// in continuously at `refill_rate` per second, and every allowed request
/// takes exactly one. A long idle period never pushes the level past
/// `capacity`.
///
/// The level and the last refill instant sit behind the bucket's own mutex,
/// so requests for different keys never contend with each other.
///
/// # Example
///
/// ```
/// use tokenguard::{Algorithm, TokenBucket};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let bucket = TokenBucket::starting_at(2.0, 1.0, start).unwrap();
///
/// assert!(bucket.try_consume_at(start));
/// assert!(bucket.try_consume_at(start));
/// assert!(!bucket.try_consume_at(start));
///
/// // 1.5s later at least one token has come back
/// assert!(bucket.try_consume_at(start + Duration::from_millis(1500)));
/// ```
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    /// Level at `now` given the bucket parameters
    ///
    /// Returns `None` when `now` is not strictly after the last refill, in
    /// which case the stored level is still current.
    fn refilled(&self, capacity: f64, refill_rate: f64, now: Instant) -> Option<f64> {
        let elapsed = now.checked_duration_since(self.last_refill)?;
        if elapsed.is_zero() {
            return None;
        }
        Some(capacity.min(self.tokens + elapsed.as_secs_f64() * refill_rate))
    }
}

impl TokenBucket {
    /// Create a full bucket whose refill clock starts now
    ///
    /// # Errors
    ///
    /// [`ConfigError::BucketCapacity`] or [`ConfigError::RefillRate`] if
    /// either value is not a positive finite number.
    pub fn new(capacity: f64, refill_rate: f64) -> Result<Self, ConfigError> {
        Self::starting_at(capacity, refill_rate, Instant::now())
    }

    /// Create a full bucket whose refill clock starts at `now`
    pub fn starting_at(capacity: f64, refill_rate: f64, now: Instant) -> Result<Self, ConfigError> {
        validate_bucket(capacity, refill_rate)?;
        Ok(Self::filled(capacity, refill_rate, now))
    }

    /// Parameters must already be validated
    pub(crate) fn filled(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        TokenBucket {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        }
    }

    /// Maximum number of tokens this bucket can hold
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens added per second
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }
}

impl Algorithm for TokenBucket {
    fn try_consume_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();

        if let Some(tokens) = state.refilled(self.capacity, self.refill_rate, now) {
            state.tokens = tokens;
            state.last_refill = now;
        }

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn peek_level_at(&self, now: Instant) -> f64 {
        let state = self.state.lock();
        state
            .refilled(self.capacity, self.refill_rate, now)
            .unwrap_or(state.tokens)
    }
}
