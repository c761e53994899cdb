//! # tokenguard
//!
//! In-process admission control: a token bucket per client key, with bucket
//! state held in a fixed-capacity LRU store so memory stays bounded no matter
//! how many distinct keys show up.
//!
//! ## Quick Start
//!
//! ```
//! use tokenguard::{LimiterConfig, RateLimiter};
//!
//! // Bursts of 5, refilling at 1 request per second, for up to 10k keys
//! let limiter = RateLimiter::new(LimiterConfig {
//!     bucket_capacity: 5.0,
//!     refill_rate_per_second: 1.0,
//!     cache_capacity: 10_000,
//! })
//! .unwrap();
//!
//! if limiter.is_allowed("user:123") {
//!     println!("Request allowed!");
//! } else {
//!     println!("Rate limited!");
//! }
//! ```
//!
//! ## How It Works
//!
//! - Each key gets a bucket holding up to `bucket_capacity` tokens, full on creation
//! - Tokens refill continuously at `refill_rate_per_second`, never past capacity
//! - Every allowed request takes one token; an empty bucket blocks
//! - At most `cache_capacity` buckets are kept. A new key arriving at a full
//!   store evicts the least recently used key, which starts over with a full
//!   bucket on its next request
//!
//! ## Thread Safety
//!
//! [`RateLimiter`] is `Send + Sync` and is meant to be shared, e.g. in an
//! [`Arc`](std::sync::Arc). Bucket lookup and creation share one short
//! critical section, so concurrent first requests for a key always end up on
//! the same bucket. Each bucket then has its own lock, so only requests for
//! the same key contend with each other.
//!
//! ## Observability
//!
//! Decisions are reported to a [`DecisionLogger`] (default: [`TracingLogger`],
//! which emits `tracing` events) and a [`MetricsSink`] (default: [`Metrics`],
//! with a Prometheus text export).
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for faster hashing
//! - `serde`: Serialize/Deserialize for [`LimiterConfig`], [`Counts`] and [`MetricsSnapshot`]

pub mod core;
pub mod observe;

pub use core::{
    Algorithm, ConfigError, LimiterConfig, LruStore, RateLimiter, RateLimiterBuilder, TokenBucket,
};
pub use observe::{
    Counts, DecisionLogger, Field, Metrics, MetricsSink, MetricsSnapshot, NoopLogger,
    TracingLogger,
};
