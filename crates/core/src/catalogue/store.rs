//! The cached, periodically refreshed tracker catalogue.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheError, SnapshotCache};
use crate::metrics;
use crate::retry::RetryPolicy;
use crate::torrent_client::TrackerSet;

use super::filter::{default_denied, filter_trackers};
use super::{CatalogueConfig, CatalogueError, TrackerSource};

/// Extra time granted to a whole refresh on top of the retry budget.
const REFRESH_SLACK: Duration = Duration::from_secs(1);

/// Health view of the catalogue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogueStatus {
    /// Number of trackers in the current snapshot.
    pub trackers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Seconds since the last successful refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Acceptable trackers, fetched from a [`TrackerSource`] and cached.
pub struct TrackerCatalogue {
    source: Arc<dyn TrackerSource>,
    cache: SnapshotCache<TrackerSet>,
    denied: BTreeSet<String>,
    retry: RetryPolicy,
    fetch_timeout: Duration,
}

impl TrackerCatalogue {
    /// Create an empty catalogue using the built-in deny-list.
    pub fn new(source: Arc<dyn TrackerSource>, retry: RetryPolicy, fetch_timeout: Duration) -> Self {
        Self {
            source,
            cache: SnapshotCache::default(),
            denied: default_denied(),
            retry,
            fetch_timeout,
        }
    }

    /// Create a catalogue from configuration.
    pub fn from_config(source: Arc<dyn TrackerSource>, config: &CatalogueConfig) -> Self {
        Self::new(
            source,
            RetryPolicy::from(&config.retry),
            Duration::from_millis(config.fetch_timeout_ms),
        )
        .with_denied(config.extra_denied.iter().cloned())
    }

    /// Add URLs to the deny-list.
    pub fn with_denied<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Download and filter the tracker list, retrying transport failures.
    ///
    /// Each attempt is bounded by the fetch timeout.
    pub async fn fetch_and_filter(&self) -> Result<TrackerSet, CatalogueError> {
        let lines = self
            .retry
            .run("fetch tracker list", || async {
                tokio::time::timeout(self.fetch_timeout, self.source.fetch_tracker_list())
                    .await
                    .unwrap_or(Err(CatalogueError::Timeout))
            })
            .await?;

        Ok(filter_trackers(lines, &self.denied))
    }

    /// Refresh the cached set. On failure the previous set stays in place.
    ///
    /// Returns the size of the new set.
    pub async fn refresh(&self) -> Result<usize, CacheError> {
        info!("Updating tracker catalogue from {}", self.source.location());

        let deadline = self.retry.budget(self.fetch_timeout).saturating_add(REFRESH_SLACK);
        match self.cache.refresh(deadline, self.fetch_and_filter()).await {
            Ok(()) => {
                let size = self.cache.get().await.len();
                metrics::CATALOGUE_TRACKERS.set(size as i64);
                metrics::CATALOGUE_REFRESHES
                    .with_label_values(&["success"])
                    .inc();
                info!(trackers = size, "Tracker catalogue updated");
                Ok(size)
            }
            Err(e) => {
                metrics::CATALOGUE_REFRESHES
                    .with_label_values(&["failed"])
                    .inc();
                let kept = self.cache.get().await.len();
                warn!(
                    error = %e,
                    kept,
                    "Failed to update tracker catalogue, keeping previous trackers"
                );
                Err(e)
            }
        }
    }

    /// The current tracker set.
    pub async fn trackers(&self) -> Arc<TrackerSet> {
        self.cache.get().await
    }

    /// Size, age and last error of the catalogue.
    pub async fn status(&self) -> CatalogueStatus {
        let trackers = self.cache.get().await.len();
        let cache = self.cache.status().await;

        CatalogueStatus {
            trackers,
            age_secs: cache.age_secs(),
            refreshed_at: cache.refreshed_at,
            last_error: cache.last_error,
        }
    }
}
