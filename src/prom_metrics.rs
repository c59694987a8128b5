//! # Prometheus Metrics — Exposition for Container Orchestration
//!
//! Exposes undian operational metrics in the Prometheus text exposition
//! format for scraping by Prometheus, Grafana Agent, or any
//! OpenMetrics-compatible collector.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `undian_http_request_duration_seconds` | Histogram | `method`, `path` | Request latency |
//! | `undian_submissions_total` | Counter | `outcome` | Submissions by admission outcome |
//! | `undian_entries_total` | Gauge | — | Rows in the entries table |
//! | `undian_db_pool_active` | Gauge | — | Checked-out pool connections |
//! | `undian_db_pool_idle` | Gauge | — | Idle pool connections |
//!
//! Gauges are refreshed from the server's background loop; counters and the
//! histogram are updated inline by the request middleware and the submission
//! handler. The `/metrics` endpoint renders the registry on each scrape.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Label set for the request duration histogram.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

/// Label set for the submissions counter. `outcome` is one of
/// "admitted", "validation", "limit_exceeded", "number_taken", "storage".
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct OutcomeLabel {
    pub outcome: String,
}

/// Thread-safe metrics registry for the undian server.
///
/// All fields use atomic types and are safe to update from any thread or
/// async task. The `Family` type creates per-label-set instances on first use.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram>,
    pub submissions: Family<OutcomeLabel, Counter>,
    pub entries_total: Gauge,
    pub db_pool_active: Gauge,
    pub db_pool_idle: Gauge,
}

impl Metrics {
    /// Create a new metrics registry with all undian metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration = Family::<HttpLabel, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 14))
        });
        registry.register(
            "undian_http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_request_duration.clone(),
        );

        let submissions = Family::<OutcomeLabel, Counter>::default();
        registry.register(
            "undian_submissions",
            "Submissions by admission outcome",
            submissions.clone(),
        );

        let entries_total = Gauge::default();
        registry.register(
            "undian_entries",
            "Number of rows in the entries table",
            entries_total.clone(),
        );

        let db_pool_active = Gauge::default();
        registry.register(
            "undian_db_pool_active",
            "Checked-out database pool connections",
            db_pool_active.clone(),
        );

        let db_pool_idle = Gauge::default();
        registry.register(
            "undian_db_pool_idle",
            "Idle database pool connections",
            db_pool_idle.clone(),
        );

        Self {
            registry,
            http_request_duration,
            submissions,
            entries_total,
            db_pool_active,
            db_pool_idle,
        }
    }

    /// Record a submission outcome on the counter family.
    pub fn record_submission(&self, outcome: &str) {
        self.submissions
            .get_or_create(&OutcomeLabel {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("encoding metrics should not fail");
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_encode_returns_valid_text() {
        let m = Metrics::new();
        m.entries_total.set(42);
        m.record_submission("admitted");
        let output = m.encode();
        assert!(output.contains("undian_entries"));
        assert!(output.contains("undian_submissions"));
        assert!(output.contains("admitted"));
    }

    #[test]
    fn metrics_default_values_are_zero() {
        let m = Metrics::new();
        let output = m.encode();
        assert!(output.contains("undian_db_pool_active"));
        assert!(output.contains("undian_db_pool_idle"));
    }

    #[test]
    fn per_outcome_counters_independent() {
        let m = Metrics::new();
        m.record_submission("admitted");
        m.record_submission("admitted");
        m.record_submission("number_taken");
        let output = m.encode();
        assert!(output.contains("admitted"));
        assert!(output.contains("number_taken"));
    }
}
