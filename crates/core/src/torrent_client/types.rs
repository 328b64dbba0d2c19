//! Types for torrent client operations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A set of tracker announce URLs.
pub type TrackerSet = BTreeSet<String>;

/// A set of label names.
pub type LabelSet = BTreeSet<String>;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// One torrent as seen by the reconciler.
///
/// A transient copy fetched on every pass; the daemon owns the real state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Daemon-assigned numeric id, used to address mutations.
    pub id: i64,
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Storage directory on the daemon's filesystem.
    pub download_dir: String,
    /// Labels currently attached.
    pub labels: LabelSet,
    /// Announce URLs currently attached.
    pub trackers: TrackerSet,
}

impl Item {
    /// Create an item with no labels or trackers.
    pub fn new(id: i64, hash: impl Into<String>, download_dir: impl Into<String>) -> Self {
        let hash = hash.into();
        Self {
            id,
            name: hash.clone(),
            hash,
            download_dir: download_dir.into(),
            labels: LabelSet::new(),
            trackers: TrackerSet::new(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the current labels.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the current trackers.
    pub fn with_trackers<I, S>(mut self, trackers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trackers = trackers.into_iter().map(Into::into).collect();
        self
    }
}

/// Upload and download byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub uploaded_bytes: u64,
    pub downloaded_bytes: u64,
}

/// Daemon-wide transfer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Since the daemon last started.
    pub current: TransferStats,
    /// Over the daemon's lifetime.
    pub cumulative: TransferStats,
}

/// Transfer counters of one torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStats {
    pub hash: String,
    pub name: String,
    /// Activity, e.g. "downloading" or "seeding".
    pub status: String,
    pub labels: LabelSet,
    pub uploaded_ever: u64,
    pub downloaded_ever: u64,
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List every torrent with its identity, labels, trackers and storage path.
    async fn list_items(&self) -> Result<Vec<Item>, TorrentClientError>;

    /// Attach additional announce URLs to a torrent. Existing trackers are kept.
    async fn add_trackers(&self, id: i64, trackers: &[String]) -> Result<(), TorrentClientError>;

    /// Replace the full label set of a torrent.
    async fn set_labels(&self, id: i64, labels: &[String]) -> Result<(), TorrentClientError>;

    /// Daemon-wide transfer counters.
    async fn session_stats(&self) -> Result<SessionStats, TorrentClientError>;

    /// Transfer counters of every torrent.
    async fn item_stats(&self) -> Result<Vec<ItemStats>, TorrentClientError>;
}
