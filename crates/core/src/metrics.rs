//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Tracker catalogue (size, refresh results)
//! - Reconciliation passes (results, duration, items seen)
//! - Mutations sent to the torrent client
//! - Transfer counters from the client snapshot

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts};

// =============================================================================
// Tracker Catalogue
// =============================================================================

/// Trackers in the current catalogue snapshot.
pub static CATALOGUE_TRACKERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "steward_catalogue_trackers",
        "Number of trackers in the current catalogue",
    )
    .unwrap()
});

/// Catalogue refreshes by result.
pub static CATALOGUE_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "steward_catalogue_refreshes_total",
            "Total tracker catalogue refreshes",
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Reconciliation
// =============================================================================

/// Reconciliation passes by result.
pub static RECONCILE_PASSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "steward_reconcile_passes_total",
            "Total reconciliation passes",
        ),
        &["result"], // "success", "list_failed"
    )
    .unwrap()
});

/// Reconciliation pass duration in seconds.
pub static RECONCILE_PASS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "steward_reconcile_pass_duration_seconds",
            "Duration of a reconciliation pass",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &[],
    )
    .unwrap()
});

/// Torrents seen by the most recent pass.
pub static ITEMS_SEEN: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "steward_reconcile_items",
        "Number of torrents listed by the last reconciliation pass",
    )
    .unwrap()
});

/// Mutations sent to the torrent client by kind and result.
pub static MUTATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "steward_mutations_total",
            "Total mutations sent to the torrent client",
        ),
        &["kind", "result"], // kind: "add_trackers", "set_labels"; result: "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Client Snapshot
// =============================================================================

/// Snapshot cache refreshes by cache and result.
pub static SNAPSHOT_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "steward_snapshot_refreshes_total",
            "Total torrent client snapshot refreshes",
        ),
        &["cache", "result"], // cache: "session", "torrents"; result: "success", "failed"
    )
    .unwrap()
});

pub static SESSION_DOWNLOAD_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("transmission_download_session_bytes", "Session download bytes").unwrap()
});

pub static SESSION_UPLOAD_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("transmission_upload_session_bytes", "Session upload bytes").unwrap()
});

pub static TOTAL_DOWNLOAD_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("transmission_download_total_bytes", "Client download bytes").unwrap()
});

pub static TOTAL_UPLOAD_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("transmission_upload_total_bytes", "Client upload bytes").unwrap()
});

/// Bytes downloaded per torrent, over its lifetime.
pub static TORRENT_DOWNLOAD_BYTES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "transmission_torrent_download_bytes",
            "Bytes downloaded by a torrent",
        ),
        &["hash"],
    )
    .unwrap()
});

/// Bytes uploaded per torrent, over its lifetime.
pub static TORRENT_UPLOAD_BYTES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("transmission_torrent_upload_bytes", "Bytes uploaded by a torrent"),
        &["hash"],
    )
    .unwrap()
});

/// Torrents by activity status.
pub static TORRENTS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("transmission_torrents", "Number of torrents by status"),
        &["status"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Catalogue
        Box::new(CATALOGUE_TRACKERS.clone()),
        Box::new(CATALOGUE_REFRESHES.clone()),
        // Reconciliation
        Box::new(RECONCILE_PASSES.clone()),
        Box::new(RECONCILE_PASS_DURATION.clone()),
        Box::new(ITEMS_SEEN.clone()),
        Box::new(MUTATIONS.clone()),
        // Client snapshot
        Box::new(SNAPSHOT_REFRESHES.clone()),
        Box::new(SESSION_DOWNLOAD_BYTES.clone()),
        Box::new(SESSION_UPLOAD_BYTES.clone()),
        Box::new(TOTAL_DOWNLOAD_BYTES.clone()),
        Box::new(TOTAL_UPLOAD_BYTES.clone()),
        Box::new(TORRENT_DOWNLOAD_BYTES.clone()),
        Box::new(TORRENT_UPLOAD_BYTES.clone()),
        Box::new(TORRENTS_BY_STATUS.clone()),
    ]
}
