//! # tokenguard CLI
//!
//! A small driver for the `tokenguard` admission-control library. It builds
//! a [`RateLimiter`](tokenguard::RateLimiter) from CLI flags or environment
//! variables, runs one of two scenarios against it and prints the resulting
//! metrics.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show all available options
//! tokenguard --help
//!
//! # Watch hits, misses and evictions with a three-slot store
//! tokenguard --scenario walkthrough
//!
//! # 8 threads x 50k requests over 20k keys, 1k-key store, JSON report
//! tokenguard --scenario load --threads 8 --requests 50000 --keys 20000 \
//!     --cache-capacity 1000 --report json --log-level warn
//! ```
//!
//! ## Configuration
//!
//! Configure via CLI arguments or environment variables (CLI takes precedence):
//!
//! ```bash
//! export TOKENGUARD_BUCKET_CAPACITY=10
//! export TOKENGUARD_REFILL_RATE=2.5
//! tokenguard --scenario load
//!
//! # List all available environment variables
//! tokenguard --list-env-vars
//! ```
//!
//! Decision events are logged under the `tokenguard::decision` target: cache
//! hits, misses and allowed requests at `info`, blocked requests at `warn`.

pub mod config;
pub mod report;
pub mod scenario;
