//! Scenarios the driver can run against a limiter
//!
//! - **Walkthrough**: a fixed sequence of five users through a three-slot
//!   store, printing the recency order after every request
//! - **Load**: worker threads issuing decisions for random keys

use crate::config::LoadConfig;
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};
use tokenguard::{Algorithm, RateLimiter};

/// Store size the walkthrough story is written for
pub const WALKTHROUGH_CACHE_CAPACITY: usize = 3;

/// One line of the walkthrough output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkthroughStep {
    pub note: &'static str,
    pub key: &'static str,
    pub allowed: bool,
    /// Tracked keys after the request, most recently used first
    pub tracked: Vec<String>,
}

/// Replay the three-slot eviction story
///
/// The limiter should have a cache capacity of
/// [`WALKTHROUGH_CACHE_CAPACITY`] for the notes to match what happens.
pub fn run_walkthrough<A: Algorithm>(
    limiter: &RateLimiter<A>,
    pause: Duration,
) -> Vec<WalkthroughStep> {
    let script: [(&'static str, &'static str); 6] = [
        ("fill the store", "user1"),
        ("fill the store", "user2"),
        ("fill the store", "user3"),
        ("touch user1 so it becomes most recently used", "user1"),
        ("new user evicts the least recently used (user2)", "user4"),
        ("user2 was evicted, so this is a miss that evicts user3", "user2"),
    ];

    let mut steps = Vec::with_capacity(script.len());
    for (i, (note, key)) in script.into_iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            thread::sleep(pause);
        }

        let allowed = limiter.is_allowed(key);
        steps.push(WalkthroughStep {
            note,
            key,
            allowed,
            tracked: limiter.tracked_keys(),
        });
    }

    steps
}

/// Outcome of a load run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSummary {
    pub elapsed: Duration,
    pub decisions: u64,
    pub allowed: u64,
}

impl LoadSummary {
    pub fn blocked(&self) -> u64 {
        self.decisions - self.allowed
    }

    pub fn decisions_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.decisions as f64 / secs
        } else {
            0.0
        }
    }
}

/// Run `threads` workers, each requesting `requests_per_thread` decisions for
/// keys drawn uniformly from `key_0 .. key_{keys-1}`
pub fn run_load<A: Algorithm>(limiter: &RateLimiter<A>, load: &LoadConfig) -> LoadSummary {
    let keys: Vec<String> = (0..load.keys).map(|i| format!("key_{i}")).collect();
    let started = Instant::now();

    let allowed: u64 = thread::scope(|s| {
        let workers: Vec<_> = (0..load.threads)
            .map(|worker| {
                let keys = &keys;
                s.spawn(move || {
                    let mut rng = rand::thread_rng();
                    let mut allowed = 0u64;
                    for _ in 0..load.requests_per_thread {
                        let key = &keys[rng.gen_range(0..keys.len())];
                        if limiter.is_allowed(key) {
                            allowed += 1;
                        }
                    }
                    tracing::debug!(worker, allowed, "load worker finished");
                    allowed
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| worker.join().unwrap_or(0))
            .sum()
    });

    LoadSummary {
        elapsed: started.elapsed(),
        decisions: (load.threads * load.requests_per_thread) as u64,
        allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokenguard::{Metrics, MetricsSink, NoopLogger};

    fn limiter(cache_capacity: usize, metrics: Arc<Metrics>) -> RateLimiter {
        RateLimiter::builder()
            .bucket_capacity(5.0)
            .refill_rate(1.0)
            .cache_capacity(cache_capacity)
            .logger(Arc::new(NoopLogger))
            .metrics(metrics)
            .build()
            .unwrap()
    }

    #[test]
    fn test_walkthrough_eviction_story() {
        let metrics = Arc::new(Metrics::new());
        let limiter = limiter(WALKTHROUGH_CACHE_CAPACITY, metrics.clone());

        let steps = run_walkthrough(&limiter, Duration::ZERO);

        assert_eq!(steps.len(), 6);
        assert!(steps.iter().all(|step| step.allowed));
        assert_eq!(steps[2].tracked, vec!["user3", "user2", "user1"]);
        assert_eq!(steps[3].tracked, vec!["user1", "user3", "user2"]);
        assert_eq!(steps[4].tracked, vec!["user4", "user1", "user3"]);
        assert_eq!(steps[5].tracked, vec!["user2", "user4", "user1"]);
        assert_eq!(metrics.evictions(), 2);
    }

    #[test]
    fn test_load_accounts_for_every_request() {
        let metrics = Arc::new(Metrics::new());
        let limiter = limiter(50, metrics.clone());
        let load = LoadConfig {
            threads: 3,
            requests_per_thread: 200,
            keys: 100,
        };

        let summary = run_load(&limiter, &load);

        assert_eq!(summary.decisions, 600);
        assert_eq!(summary.allowed + summary.blocked(), 600);
        assert_eq!(metrics.global_counts().total(), 600);
        assert_eq!(metrics.global_counts().allowed, summary.allowed);
        assert!(limiter.len() <= 50);
    }

    #[test]
    fn test_decisions_per_second_with_zero_elapsed() {
        let summary = LoadSummary {
            elapsed: Duration::ZERO,
            decisions: 10,
            allowed: 4,
        };
        assert_eq!(summary.decisions_per_second(), 0.0);
        assert_eq!(summary.blocked(), 6);
    }
}
