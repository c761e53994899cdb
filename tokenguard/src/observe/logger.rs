//! Decision logging
//!
//! [`TracingLogger`] is the default. It forwards every observation to the
//! `tracing` facade under the `tokenguard::decision` target, leaving the choice
//! of subscriber to the application.

use std::fmt;

/// Extra `name=value` pair attached to a log line
pub type Field<'a> = (&'a str, &'a dyn fmt::Display);

/// Sink for per-key admission observations
///
/// Implementations must be cheap and must never fail or block the caller for
/// long; the limiter calls them on every request.
pub trait DecisionLogger: Send + Sync {
    fn info(&self, key: &str, message: &str, fields: &[Field<'_>]);
    fn warn(&self, key: &str, message: &str, fields: &[Field<'_>]);
}

/// Logger emitting `tracing` events
///
/// ```
/// use tokenguard::{DecisionLogger, TracingLogger};
///
/// let logger = TracingLogger;
/// logger.info("user:42", "allowed", &[("tokens", &4.0)]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl DecisionLogger for TracingLogger {
    fn info(&self, key: &str, message: &str, fields: &[Field<'_>]) {
        tracing::info!(target: "tokenguard::decision", key, "{message}{}", Fields(fields));
    }

    fn warn(&self, key: &str, message: &str, fields: &[Field<'_>]) {
        tracing::warn!(target: "tokenguard::decision", key, "{message}{}", Fields(fields));
    }
}

/// Logger that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl DecisionLogger for NoopLogger {
    fn info(&self, _key: &str, _message: &str, _fields: &[Field<'_>]) {}
    fn warn(&self, _key: &str, _message: &str, _fields: &[Field<'_>]) {}
}

/// Renders fields as ` | name=value` segments
pub(crate) struct Fields<'a, 'b>(pub &'a [Field<'b>]);

impl fmt::Display for Fields<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.0 {
            write!(f, " | {name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_rendering() {
        let tokens = 1.5;
        let rendered = format!("allowed{}", Fields(&[("tokens", &tokens), ("burst", &"yes")]));
        assert_eq!(rendered, "allowed | tokens=1.5 | burst=yes");
    }

    #[test]
    fn test_empty_fields_render_nothing() {
        assert_eq!(Fields(&[]).to_string(), "");
    }

    #[test]
    fn test_loggers_accept_calls_without_subscriber() {
        TracingLogger.info("k", "cache hit", &[]);
        TracingLogger.warn("k", "blocked", &[("tokens", &0.25)]);
        NoopLogger.info("k", "cache hit", &[]);
        NoopLogger.warn("k", "blocked", &[]);
    }
}
