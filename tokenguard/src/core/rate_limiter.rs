//! Admission coordinator
//!
//! This module provides the [`RateLimiter`] which answers "may this key
//! proceed?" by finding or creating the key's bucket in an [`LruStore`] and
//! asking that bucket for a decision.

use super::{Algorithm, ConfigError, LimiterConfig, LruStore, TokenBucket};
use crate::observe::{DecisionLogger, Metrics, MetricsSink, TracingLogger};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

type Factory<A> = Box<dyn Fn(Instant) -> A + Send + Sync>;

/// Per-key admission control backed by an LRU-bounded set of buckets
///
/// Every distinct key gets its own [`Algorithm`] instance, created lazily on
/// the key's first request. At most `cache_capacity` instances are kept;
/// when a new key arrives at a full store, the least recently used key's
/// state is dropped and that key starts over with a fresh bucket next time.
///
/// The store sits behind one mutex that is held only while a bucket handle
/// is looked up or created. The decision itself runs under the bucket's own
/// lock, so requests for different keys never wait on each other's
/// arithmetic.
///
/// # Example
///
/// ```
/// use tokenguard::{LimiterConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(LimiterConfig {
///     bucket_capacity: 1.0,
///     refill_rate_per_second: 10.0,
///     cache_capacity: 1_000,
/// })
/// .unwrap();
///
/// assert!(limiter.is_allowed("A"));
/// assert!(!limiter.is_allowed("A"));
/// assert!(limiter.is_allowed("B"));
/// ```
pub struct RateLimiter<A: Algorithm = TokenBucket> {
    buckets: Mutex<LruStore<String, Arc<A>>>,
    factory: Factory<A>,
    logger: Arc<dyn DecisionLogger>,
    metrics: Arc<dyn MetricsSink>,
}

/// How a bucket handle was obtained
enum Lookup {
    Hit,
    Miss { evicted: Option<String> },
}

impl RateLimiter<TokenBucket> {
    /// Create a token-bucket limiter with a [`TracingLogger`] and fresh [`Metrics`]
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any configuration value is not positive.
    pub fn new(config: LimiterConfig) -> Result<Self, ConfigError> {
        RateLimiterBuilder::from_config(config).build()
    }

    /// Start configuring a limiter
    ///
    /// ```
    /// use std::sync::Arc;
    /// use tokenguard::{Metrics, MetricsSink, NoopLogger, RateLimiter};
    ///
    /// let metrics = Arc::new(Metrics::new());
    /// let limiter = RateLimiter::builder()
    ///     .bucket_capacity(5.0)
    ///     .refill_rate(1.0)
    ///     .cache_capacity(10_000)
    ///     .logger(Arc::new(NoopLogger))
    ///     .metrics(metrics.clone())
    ///     .build()
    ///     .unwrap();
    ///
    /// limiter.is_allowed("user:1");
    /// assert_eq!(metrics.global_counts().allowed, 1);
    /// ```
    pub fn builder() -> RateLimiterBuilder {
        RateLimiterBuilder::default()
    }
}

impl<A: Algorithm> RateLimiter<A> {
    /// Decide whether a request for `key` may proceed now
    pub fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now())
    }

    /// Decide whether a request for `key` may proceed at `now`
    ///
    /// `now` is also the refill starting point of a bucket created by this
    /// call.
    pub fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let (bucket, lookup) = self.bucket_for(key, now);

        match lookup {
            Lookup::Hit => self.logger.info(key, "cache hit", &[]),
            Lookup::Miss { evicted } => {
                self.logger.info(key, "cache miss, created bucket", &[]);
                if let Some(evicted) = evicted {
                    tracing::debug!(key = %evicted, "evicted least recently used bucket");
                    self.metrics.record_eviction(&evicted);
                }
            }
        }

        let allowed = bucket.try_consume_at(now);
        let tokens = bucket.peek_level_at(now);

        if allowed {
            self.metrics.record_allowed(key);
            self.logger.info(key, "allowed", &[("tokens", &tokens)]);
        } else {
            self.metrics.record_blocked(key);
            self.logger.warn(key, "blocked", &[("tokens", &tokens)]);
        }

        allowed
    }

    /// Find or create the canonical bucket for `key`
    ///
    /// The lookup and the conditional insert share one critical section, so
    /// concurrent first requests for a key all end up with the same bucket.
    fn bucket_for(&self, key: &str, now: Instant) -> (Arc<A>, Lookup) {
        let mut buckets = self.buckets.lock();

        if let Some(bucket) = buckets.get(key) {
            return (Arc::clone(bucket), Lookup::Hit);
        }

        let bucket = Arc::new((self.factory)(now));
        let evicted = buckets
            .put(key.to_owned(), Arc::clone(&bucket))
            .map(|(evicted_key, _)| evicted_key);

        (bucket, Lookup::Miss { evicted })
    }

    /// Number of keys currently holding a bucket
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.lock().is_empty()
    }

    /// Whether `key` currently holds a bucket, without touching its recency
    pub fn contains(&self, key: &str) -> bool {
        self.buckets.lock().contains(key)
    }

    /// Keys currently holding a bucket, most recently used first
    pub fn tracked_keys(&self) -> Vec<String> {
        self.buckets.lock().keys().cloned().collect()
    }

    /// Maximum number of keys tracked at once
    pub fn cache_capacity(&self) -> usize {
        self.buckets.lock().capacity()
    }

    /// The metrics sink decisions are reported to
    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }
}

/// Builder for a [`RateLimiter`]
///
/// Unset collaborators default to [`TracingLogger`] and a fresh [`Metrics`].
pub struct RateLimiterBuilder {
    config: LimiterConfig,
    logger: Option<Arc<dyn DecisionLogger>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::from_config(LimiterConfig::default())
    }
}

impl RateLimiterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: LimiterConfig) -> Self {
        Self {
            config,
            logger: None,
            metrics: None,
        }
    }

    /// Maximum tokens per bucket
    pub fn bucket_capacity(mut self, capacity: f64) -> Self {
        self.config.bucket_capacity = capacity;
        self
    }

    /// Tokens added to each bucket per second
    pub fn refill_rate(mut self, per_second: f64) -> Self {
        self.config.refill_rate_per_second = per_second;
        self
    }

    /// Maximum number of distinct keys held at once
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn DecisionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build a token-bucket limiter
    pub fn build(self) -> Result<RateLimiter<TokenBucket>, ConfigError> {
        let LimiterConfig {
            bucket_capacity,
            refill_rate_per_second,
            ..
        } = self.config;
        self.build_with(move |now| {
            TokenBucket::filled(bucket_capacity, refill_rate_per_second, now)
        })
    }

    /// Build a limiter whose per-key state comes from `factory`
    ///
    /// The bucket parameters in the configuration are still validated but
    /// are otherwise left to the factory.
    pub fn build_with<A, F>(self, factory: F) -> Result<RateLimiter<A>, ConfigError>
    where
        A: Algorithm,
        F: Fn(Instant) -> A + Send + Sync + 'static,
    {
        self.config.validate()?;
        let store = LruStore::new(self.config.cache_capacity)?;

        tracing::debug!(
            bucket_capacity = self.config.bucket_capacity,
            refill_rate = self.config.refill_rate_per_second,
            cache_capacity = self.config.cache_capacity,
            "rate limiter configured"
        );

        Ok(RateLimiter {
            buckets: Mutex::new(store),
            factory: Box::new(factory),
            logger: self.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(Metrics::new())),
        })
    }
}
