//! Types for reconciliation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::torrent_client::TorrentClientError;

/// The mutation a reconciler sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    AddTrackers,
    SetLabels,
}

impl MutationKind {
    /// Stable identifier used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::AddTrackers => "add_trackers",
            MutationKind::SetLabels => "set_labels",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The torrent list could not be fetched, so the pass did nothing.
    #[error("Failed to list torrents: {0}")]
    ListFailed(#[source] TorrentClientError),

    /// A single mutation failed. Other torrents are unaffected.
    #[error("{kind} failed for {item} with {payload:?}: {source}")]
    Mutation {
        /// Hash of the torrent.
        item: String,
        kind: MutationKind,
        /// The trackers or labels that were sent.
        payload: Vec<String>,
        #[source]
        source: TorrentClientError,
    },
}

/// Result of reconciling one aspect of one torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Already in the desired state, nothing sent.
    Compliant,
    /// A mutation was sent and accepted.
    Applied,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Torrents listed.
    pub items: usize,
    /// Torrents that received new trackers.
    pub trackers_added: usize,
    /// Torrents whose labels were replaced.
    pub labels_set: usize,
    /// Mutations that failed.
    pub failures: usize,
}

impl PassReport {
    /// True if the pass sent at least one mutation, successful or not.
    pub fn changed_anything(&self) -> bool {
        self.trackers_added + self.labels_set + self.failures > 0
    }
}

/// Lifecycle state of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Stopped,
    /// Performing the initial catalogue fetch.
    Starting,
    Running,
}

/// Snapshot of the loop for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcilerStatus {
    pub state: LoopState,
    /// Passes completed since the process started, including failed ones.
    pub passes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pass: Option<PassReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
