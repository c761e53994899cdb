//! Core components of the tokenguard admission-control library
//!
//! This module contains the fundamental building blocks:
//! - [`algorithm`]: The per-key decision capability and the token bucket
//! - [`store`]: The fixed-capacity LRU store holding per-key state
//! - [`rate_limiter`]: The coordinator gluing the two together

pub mod algorithm;
pub mod rate_limiter;
pub mod store;

pub use algorithm::{Algorithm, TokenBucket};
pub use rate_limiter::{RateLimiter, RateLimiterBuilder};
pub use store::LruStore;

use thiserror::Error;

/// Errors raised when a limiter, bucket or store is constructed
///
/// These are the only errors in the library. Once a [`RateLimiter`] exists,
/// every admission decision is a plain `bool`.
///
/// # Example
///
/// ```
/// use tokenguard::{ConfigError, LimiterConfig, RateLimiter};
///
/// let config = LimiterConfig {
///     bucket_capacity: 10.0,
///     refill_rate_per_second: 0.0,
///     cache_capacity: 1_000,
/// };
///
/// match RateLimiter::new(config) {
///     Err(ConfigError::RefillRate(rate)) => println!("bad refill rate: {rate}"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Bucket capacity was zero, negative or not finite
    #[error("bucket capacity must be a positive finite number, got {0}")]
    BucketCapacity(f64),
    /// Refill rate was zero, negative or not finite
    #[error("refill rate must be a positive finite number of tokens per second, got {0}")]
    RefillRate(f64),
    /// The store was asked to hold zero keys
    #[error("cache capacity must be at least 1")]
    CacheCapacity,
}

/// Shared configuration applied to every bucket a [`RateLimiter`] creates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimiterConfig {
    /// Maximum tokens per bucket, i.e. the largest burst a key may issue
    pub bucket_capacity: f64,
    /// Tokens added to each bucket per second
    pub refill_rate_per_second: f64,
    /// Maximum number of distinct keys tracked at once
    pub cache_capacity: usize,
}

impl LimiterConfig {
    /// Reject any value that would make the limiter always block or grow without bound
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bucket(self.bucket_capacity, self.refill_rate_per_second)?;
        if self.cache_capacity == 0 {
            return Err(ConfigError::CacheCapacity);
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: 10.0,
            refill_rate_per_second: 1.0,
            cache_capacity: 10_000,
        }
    }
}

pub(crate) fn validate_bucket(capacity: f64, refill_rate: f64) -> Result<(), ConfigError> {
    if !(capacity.is_finite() && capacity > 0.0) {
        return Err(ConfigError::BucketCapacity(capacity));
    }
    if !(refill_rate.is_finite() && refill_rate > 0.0) {
        return Err(ConfigError::RefillRate(refill_rate));
    }
    Ok(())
}
