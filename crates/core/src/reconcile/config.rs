//! Reconciler configuration.

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Enable/disable reconciliation.
    /// When disabled the torrent client is never mutated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often to run a reconciliation pass (seconds).
    #[serde(default = "default_pass_interval")]
    pub pass_interval_secs: u64,

    /// Deadline for listing torrents (milliseconds, per attempt).
    #[serde(default = "default_call_timeout")]
    pub list_timeout_ms: u64,

    /// Deadline for a single add-trackers or set-labels call (milliseconds).
    #[serde(default = "default_call_timeout")]
    pub mutation_timeout_ms: u64,

    /// Torrents reconciled concurrently within a pass (1 = sequential).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_items: usize,

    /// Retry policy for listing torrents.
    #[serde(default = "default_list_retry")]
    pub retry: RetryConfig,

    /// How often to refresh the client's transfer stats snapshot (seconds).
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,

    /// Deadline for each stats call (milliseconds).
    #[serde(default = "default_snapshot_timeout")]
    pub snapshot_timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_pass_interval() -> u64 {
    60 // 1 minute
}

fn default_call_timeout() -> u64 {
    1000 // 1 second
}

fn default_max_concurrent() -> usize {
    1
}

fn default_snapshot_interval() -> u64 {
    5
}

fn default_snapshot_timeout() -> u64 {
    15000 // 15 seconds
}

fn default_list_retry() -> RetryConfig {
    RetryConfig {
        attempts: 3,
        delay_ms: 1000,
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            pass_interval_secs: default_pass_interval(),
            list_timeout_ms: default_call_timeout(),
            mutation_timeout_ms: default_call_timeout(),
            max_concurrent_items: default_max_concurrent(),
            retry: default_list_retry(),
            snapshot_interval_secs: default_snapshot_interval(),
            snapshot_timeout_ms: default_snapshot_timeout(),
        }
    }
}
