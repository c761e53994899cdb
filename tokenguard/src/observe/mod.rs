//! Collaborators that consume admission decisions
//!
//! The [`RateLimiter`](crate::RateLimiter) reports every decision to a
//! [`DecisionLogger`] and a [`MetricsSink`]. Both are injected at construction
//! time, so tests and embedding applications can swap them out.

pub mod logger;
pub mod metrics;

pub use logger::{DecisionLogger, Field, NoopLogger, TracingLogger};
pub use metrics::{Counts, Metrics, MetricsSink, MetricsSnapshot};
