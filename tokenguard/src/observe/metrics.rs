//! Allow/block counters
//!
//! Global counters are plain atomics. Per-key counters live in a map behind a
//! mutex, since a new key needs an insert.

use parking_lot::Mutex;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

/// Allowed/blocked totals for one key or for the whole limiter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Counts {
    pub allowed: u64,
    pub blocked: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.allowed + self.blocked
    }
}

/// Receiver of admission outcomes
///
/// Must tolerate concurrent calls from many threads.
pub trait MetricsSink: Send + Sync {
    fn record_allowed(&self, key: &str);
    fn record_blocked(&self, key: &str);

    /// Called when `key`'s state was dropped to make room for another key
    fn record_eviction(&self, _key: &str) {}

    /// Totals across all keys
    fn global_counts(&self) -> Counts;

    /// Totals for one key; zero for keys never seen
    fn user_counts(&self, key: &str) -> Counts;
}

/// Point-in-time copy of [`Metrics`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub global: Counts,
    pub evictions: u64,
    pub tracked_keys: usize,
}

/// Default thread-safe [`MetricsSink`]
///
/// # Example
///
/// ```
/// use tokenguard::{Counts, Metrics, MetricsSink};
///
/// let metrics = Metrics::new();
/// metrics.record_allowed("a");
/// metrics.record_blocked("a");
/// metrics.record_allowed("b");
///
/// assert_eq!(metrics.user_counts("a"), Counts { allowed: 1, blocked: 1 });
/// assert_eq!(metrics.global_counts(), Counts { allowed: 2, blocked: 1 });
/// ```
pub struct Metrics {
    start_time: Instant,
    allowed: AtomicU64,
    blocked: AtomicU64,
    evictions: AtomicU64,
    per_key: Mutex<HashMap<String, Counts>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            per_key: Mutex::new(HashMap::new()),
        }
    }

    /// Number of bucket evictions observed
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Number of distinct keys with at least one recorded decision
    pub fn tracked_keys(&self) -> usize {
        self.per_key.lock().len()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            global: self.global_counts(),
            evictions: self.evictions(),
            tracked_keys: self.tracked_keys(),
        }
    }

    /// Per-key counts sorted by total decisions, busiest first
    pub fn top_keys(&self, limit: usize) -> Vec<(String, Counts)> {
        let mut entries: Vec<(String, Counts)> = self
            .per_key
            .lock()
            .iter()
            .map(|(key, counts)| (key.clone(), *counts))
            .collect();
        entries.sort_by(|a, b| b.1.total().cmp(&a.1.total()).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::with_capacity(800);

        let _ = writeln!(
            output,
            "# HELP tokenguard_uptime_seconds Time since metrics creation in seconds"
        );
        let _ = writeln!(output, "# TYPE tokenguard_uptime_seconds gauge");
        let _ = writeln!(
            output,
            "tokenguard_uptime_seconds {}\n",
            snapshot.uptime_seconds
        );

        let _ = writeln!(
            output,
            "# HELP tokenguard_requests_total Total number of admission decisions"
        );
        let _ = writeln!(output, "# TYPE tokenguard_requests_total counter");
        let _ = writeln!(
            output,
            "tokenguard_requests_total {}\n",
            snapshot.global.total()
        );

        let _ = writeln!(
            output,
            "# HELP tokenguard_requests_allowed Total requests allowed"
        );
        let _ = writeln!(output, "# TYPE tokenguard_requests_allowed counter");
        let _ = writeln!(
            output,
            "tokenguard_requests_allowed {}\n",
            snapshot.global.allowed
        );

        let _ = writeln!(
            output,
            "# HELP tokenguard_requests_blocked Total requests blocked"
        );
        let _ = writeln!(output, "# TYPE tokenguard_requests_blocked counter");
        let _ = writeln!(
            output,
            "tokenguard_requests_blocked {}\n",
            snapshot.global.blocked
        );

        let _ = writeln!(
            output,
            "# HELP tokenguard_bucket_evictions Total number of buckets evicted from the store"
        );
        let _ = writeln!(output, "# TYPE tokenguard_bucket_evictions counter");
        let _ = writeln!(
            output,
            "tokenguard_bucket_evictions {}\n",
            snapshot.evictions
        );

        let _ = writeln!(
            output,
            "# HELP tokenguard_tracked_keys Number of distinct keys with recorded decisions"
        );
        let _ = writeln!(output, "# TYPE tokenguard_tracked_keys gauge");
        let _ = writeln!(output, "tokenguard_tracked_keys {}", snapshot.tracked_keys);

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for Metrics {
    fn record_allowed(&self, key: &str) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
        let mut per_key = self.per_key.lock();
        match per_key.get_mut(key) {
            Some(counts) => counts.allowed += 1,
            None => {
                per_key.insert(
                    key.to_owned(),
                    Counts {
                        allowed: 1,
                        blocked: 0,
                    },
                );
            }
        }
    }

    fn record_blocked(&self, key: &str) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
        let mut per_key = self.per_key.lock();
        match per_key.get_mut(key) {
            Some(counts) => counts.blocked += 1,
            None => {
                per_key.insert(
                    key.to_owned(),
                    Counts {
                        allowed: 0,
                        blocked: 1,
                    },
                );
            }
        }
    }

    fn record_eviction(&self, _key: &str) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn global_counts(&self) -> Counts {
        Counts {
            allowed: self.allowed.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
        }
    }

    fn user_counts(&self, key: &str) -> Counts {
        self.per_key.lock().get(key).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.global_counts(), Counts::default());
        assert_eq!(metrics.evictions(), 0);
        assert_eq!(metrics.tracked_keys(), 0);
    }

    #[test]
    fn test_unknown_key_reports_zero() {
        let metrics = Metrics::new();
        metrics.record_allowed("known");
        assert_eq!(metrics.user_counts("unknown"), Counts::default());
    }

    #[test]
    fn test_record_per_key_and_global() {
        let metrics = Metrics::new();

        metrics.record_allowed("A");
        metrics.record_blocked("A");
        metrics.record_allowed("B");

        assert_eq!(
            metrics.user_counts("A"),
            Counts {
                allowed: 1,
                blocked: 1
            }
        );
        assert_eq!(
            metrics.user_counts("B"),
            Counts {
                allowed: 1,
                blocked: 0
            }
        );
        assert_eq!(
            metrics.global_counts(),
            Counts {
                allowed: 2,
                blocked: 1
            }
        );
        assert_eq!(metrics.tracked_keys(), 2);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(Metrics::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for i in 0..1_000 {
                        let key = format!("key_{}", (t + i) % 4);
                        if i % 2 == 0 {
                            metrics.record_allowed(&key);
                        } else {
                            metrics.record_blocked(&key);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let global = metrics.global_counts();
        assert_eq!(global.allowed, 4_000);
        assert_eq!(global.blocked, 4_000);

        let per_key_total: u64 = (0..4)
            .map(|k| metrics.user_counts(&format!("key_{k}")).total())
            .sum();
        assert_eq!(per_key_total, 8_000);
    }

    #[test]
    fn test_top_keys() {
        let metrics = Metrics::new();
        for _ in 0..3 {
            metrics.record_allowed("busy");
        }
        metrics.record_blocked("quiet");
        metrics.record_allowed("medium");
        metrics.record_blocked("medium");

        let top = metrics.top_keys(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "busy");
        assert_eq!(top[1].0, "medium");
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_allowed("a");
        metrics.record_blocked("a");
        metrics.record_eviction("a");

        let output = metrics.export_prometheus();

        assert!(output.contains("tokenguard_uptime_seconds"));
        assert!(output.contains("tokenguard_requests_total 2"));
        assert!(output.contains("tokenguard_requests_allowed 1"));
        assert!(output.contains("tokenguard_requests_blocked 1"));
        assert!(output.contains("tokenguard_bucket_evictions 1"));
        assert!(output.contains("tokenguard_tracked_keys 1"));
    }
}
