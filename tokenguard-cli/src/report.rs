//! Final metrics report in the selected output format

use crate::config::ReportFormat;
use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use tokenguard::{Counts, Metrics, MetricsSnapshot};

/// Number of per-key rows shown in text and JSON reports
const TOP_KEYS: usize = 5;

#[derive(Debug, Serialize)]
struct KeyReport {
    key: String,
    #[serde(flatten)]
    counts: Counts,
}

#[derive(Debug, Serialize)]
struct JsonReport {
    #[serde(flatten)]
    snapshot: MetricsSnapshot,
    top_keys: Vec<KeyReport>,
}

/// Render `metrics` in `format`
pub fn render(metrics: &Metrics, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(metrics)),
        ReportFormat::Prometheus => Ok(metrics.export_prometheus()),
        ReportFormat::Json => {
            let report = JsonReport {
                snapshot: metrics.snapshot(),
                top_keys: metrics
                    .top_keys(TOP_KEYS)
                    .into_iter()
                    .map(|(key, counts)| KeyReport { key, counts })
                    .collect(),
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

fn render_text(metrics: &Metrics) -> String {
    let snapshot = metrics.snapshot();
    let mut output = String::new();

    let _ = writeln!(output, "Decisions:    {}", snapshot.global.total());
    let _ = writeln!(output, "Allowed:      {}", snapshot.global.allowed);
    let _ = writeln!(output, "Blocked:      {}", snapshot.global.blocked);
    let _ = writeln!(output, "Evictions:    {}", snapshot.evictions);
    let _ = writeln!(output, "Tracked keys: {}", snapshot.tracked_keys);

    let top = metrics.top_keys(TOP_KEYS);
    if !top.is_empty() {
        let _ = writeln!(output, "Busiest keys:");
        for (key, counts) in top {
            let _ = writeln!(
                output,
                "  {key:<16} allowed={} blocked={}",
                counts.allowed, counts.blocked
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenguard::MetricsSink;

    fn sample() -> Metrics {
        let metrics = Metrics::new();
        metrics.record_allowed("A");
        metrics.record_blocked("A");
        metrics.record_allowed("B");
        metrics.record_eviction("C");
        metrics
    }

    #[test]
    fn test_text_report() {
        let output = render(&sample(), ReportFormat::Text).unwrap();
        assert!(output.contains("Decisions:    3"));
        assert!(output.contains("Allowed:      2"));
        assert!(output.contains("Blocked:      1"));
        assert!(output.contains("Evictions:    1"));
        assert!(output.contains("allowed=1 blocked=1"));
    }

    #[test]
    fn test_prometheus_report() {
        let output = render(&sample(), ReportFormat::Prometheus).unwrap();
        assert!(output.contains("tokenguard_requests_allowed 2"));
        assert!(output.contains("tokenguard_bucket_evictions 1"));
    }

    #[test]
    fn test_json_report() {
        let output = render(&sample(), ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["global"]["allowed"], 2);
        assert_eq!(value["global"]["blocked"], 1);
        assert_eq!(value["evictions"], 1);
        assert_eq!(value["tracked_keys"], 2);
        assert_eq!(value["top_keys"][0]["key"], "A");
        assert_eq!(value["top_keys"][0]["blocked"], 1);
    }
}
