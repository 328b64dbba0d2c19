//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the steward server:
//! - HTTP request metrics (latency, counts)
//! - Loop and catalogue freshness (collected dynamically)
//! - Everything registered by `steward_core::metrics`

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use steward_core::LoopState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "steward_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("steward_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

// =============================================================================
// Loop Metrics (collected dynamically)
// =============================================================================

/// Reconciliation loop running state (1 = running, 0 = otherwise).
pub static RECONCILER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "steward_reconciler_running",
        "Whether the reconciliation loop is running (1) or not (0)",
    )
    .unwrap()
});

/// Seconds since the catalogue was last refreshed successfully.
pub static CATALOGUE_AGE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "steward_catalogue_age_seconds",
        "Seconds since the last successful catalogue refresh (-1 if never)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let server_metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        // Loop
        Box::new(RECONCILER_RUNNING.clone()),
        Box::new(CATALOGUE_AGE.clone()),
    ];

    // Core metrics (catalogue, passes, mutations)
    for metric in server_metrics
        .into_iter()
        .chain(steward_core::metrics::all_metrics())
    {
        if let Err(e) = registry.register(metric) {
            tracing::error!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the loop, the catalogue and the
/// cached client snapshot as of the scrape.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let running = match state.reconciler() {
        Some(reconciler) => {
            reconciler.snapshot().export_metrics().await;
            reconciler.status().await.state == LoopState::Running
        }
        None => false,
    };
    RECONCILER_RUNNING.set(i64::from(running));

    let catalogue = state.catalogue().status().await;
    CATALOGUE_AGE.set(catalogue.age_secs.unwrap_or(-1));
}
