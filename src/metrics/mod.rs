//! Metrics using Prometheus.
//!
//! A run records what it pulled, acknowledged and wrote, the failures it hit
//! and how long each stage took:
//!
//! - **Counters**: messages pulled, messages acknowledged, rows inserted, failures by kind
//! - **Histograms**: latency per pipeline stage (`fetch`, `transform`, `sink`, `ack`)
//!
//! `pullsink run --metrics` prints the text exposition after the run.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tracing::error;

/// Global metrics registry
static METRICS_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Global metrics instance
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    let metrics = Metrics::new();
    if let Err(e) = metrics.register(&METRICS_REGISTRY) {
        error!("Failed to register metrics: {}", e);
    }
    Arc::new(metrics)
});

/// Metrics collector for pullsink
pub struct Metrics {
    /// Total messages pulled from the subscription (counter)
    pub messages_pulled_total: IntCounter,
    /// Total messages acknowledged (counter)
    pub messages_acked_total: IntCounter,
    /// Total rows appended to the table (counter)
    pub rows_inserted_total: IntCounter,
    /// Total failed runs by error kind (counter)
    pub failures_total: IntCounterVec,
    /// Stage latency in seconds (histogram)
    pub stage_latency_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        let messages_pulled_total = IntCounter::new(
            "pullsink_messages_pulled_total",
            "Total messages pulled from the subscription",
        )
        .expect("Failed to create messages_pulled_total metric");

        let messages_acked_total = IntCounter::new(
            "pullsink_messages_acked_total",
            "Total messages acknowledged",
        )
        .expect("Failed to create messages_acked_total metric");

        let rows_inserted_total = IntCounter::new(
            "pullsink_rows_inserted_total",
            "Total rows appended to the destination table",
        )
        .expect("Failed to create rows_inserted_total metric");

        let failures_total = IntCounterVec::new(
            Opts::new("pullsink_failures_total", "Total failed runs"),
            &["kind"],
        )
        .expect("Failed to create failures_total metric");

        let stage_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pullsink_stage_latency_seconds",
                "Pipeline stage latency in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["stage"],
        )
        .expect("Failed to create stage_latency_seconds metric");

        Self {
            messages_pulled_total,
            messages_acked_total,
            rows_inserted_total,
            failures_total,
            stage_latency_seconds,
        }
    }

    /// Register all metrics with the registry
    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.messages_pulled_total.clone()))?;
        registry.register(Box::new(self.messages_acked_total.clone()))?;
        registry.register(Box::new(self.rows_inserted_total.clone()))?;
        registry.register(Box::new(self.failures_total.clone()))?;
        registry.register(Box::new(self.stage_latency_seconds.clone()))?;
        Ok(())
    }

    /// Gather metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = METRICS_REGISTRY.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the global metrics instance
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.clone()
}
