//! Cached view of the torrent client's transfer counters.
//!
//! Two caches, refreshed together on the loop's snapshot timer: daemon-wide
//! session stats and per-torrent stats. A failed refresh keeps the previous
//! values. `export_metrics` copies what is cached into the Prometheus
//! gauges, so a scrape never waits on the daemon.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheStatus, SnapshotCache};
use crate::metrics;
use crate::torrent_client::{ItemStats, SessionStats, TorrentClient};

/// Health view of both caches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotStatus {
    /// Torrents in the current per-torrent snapshot.
    pub torrents: usize,
    pub session: CacheStatus,
    pub items: CacheStatus,
}

/// Session and per-torrent transfer counters of one torrent client.
pub struct ClientSnapshot {
    client: Arc<dyn TorrentClient>,
    session: SnapshotCache<SessionStats>,
    items: SnapshotCache<Vec<ItemStats>>,
    timeout: Duration,
}

impl ClientSnapshot {
    /// Create an empty snapshot. Each refresh call is bounded by `timeout`.
    pub fn new(client: Arc<dyn TorrentClient>, timeout: Duration) -> Self {
        Self {
            client,
            session: SnapshotCache::default(),
            items: SnapshotCache::default(),
            timeout,
        }
    }

    /// Refresh both caches. One failing does not stop the other.
    ///
    /// Returns the first error, if any.
    pub async fn refresh(&self) -> Result<(), CacheError> {
        let (session, items) = tokio::join!(
            self.session.refresh(self.timeout, self.client.session_stats()),
            self.items.refresh(self.timeout, self.client.item_stats()),
        );

        for (cache, result) in [("session", &session), ("torrents", &items)] {
            match result {
                Ok(()) => {
                    metrics::SNAPSHOT_REFRESHES
                        .with_label_values(&[cache, "success"])
                        .inc();
                    debug!(cache, "Client snapshot refreshed");
                }
                Err(e) => {
                    metrics::SNAPSHOT_REFRESHES
                        .with_label_values(&[cache, "failed"])
                        .inc();
                    warn!(cache, error = %e, "Failed to refresh client snapshot, keeping previous values");
                }
            }
        }

        session.and(items)
    }

    /// The cached session counters.
    pub async fn session(&self) -> Arc<SessionStats> {
        self.session.get().await
    }

    /// The cached per-torrent counters.
    pub async fn items(&self) -> Arc<Vec<ItemStats>> {
        self.items.get().await
    }

    pub async fn status(&self) -> SnapshotStatus {
        SnapshotStatus {
            torrents: self.items.get().await.len(),
            session: self.session.status().await,
            items: self.items.status().await,
        }
    }

    /// Copy the cached counters into the transfer gauges.
    ///
    /// Caches that were never refreshed are not exported. Per-torrent gauges
    /// are rebuilt, so torrents gone from the daemon drop out.
    pub async fn export_metrics(&self) {
        if self.session.status().await.refreshed_at.is_some() {
            let session = self.session.get().await;
            metrics::SESSION_DOWNLOAD_BYTES.set(session.current.downloaded_bytes as i64);
            metrics::SESSION_UPLOAD_BYTES.set(session.current.uploaded_bytes as i64);
            metrics::TOTAL_DOWNLOAD_BYTES.set(session.cumulative.downloaded_bytes as i64);
            metrics::TOTAL_UPLOAD_BYTES.set(session.cumulative.uploaded_bytes as i64);
        }

        if self.items.status().await.refreshed_at.is_some() {
            let items = self.items.get().await;
            metrics::TORRENT_DOWNLOAD_BYTES.reset();
            metrics::TORRENT_UPLOAD_BYTES.reset();
            metrics::TORRENTS_BY_STATUS.reset();

            for item in items.iter() {
                metrics::TORRENT_DOWNLOAD_BYTES
                    .with_label_values(&[item.hash.as_str()])
                    .set(item.downloaded_ever as i64);
                metrics::TORRENT_UPLOAD_BYTES
                    .with_label_values(&[item.hash.as_str()])
                    .set(item.uploaded_ever as i64);
                metrics::TORRENTS_BY_STATUS
                    .with_label_values(&[item.status.as_str()])
                    .inc();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockTorrentClient};
    use crate::torrent_client::TransferStats;
    use prometheus::core::Collector;

    fn session(up: u64, down: u64, total_up: u64, total_down: u64) -> SessionStats {
        SessionStats {
            current: TransferStats {
                uploaded_bytes: up,
                downloaded_bytes: down,
            },
            cumulative: TransferStats {
                uploaded_bytes: total_up,
                downloaded_bytes: total_down,
            },
        }
    }

    fn exported_hashes() -> Vec<String> {
        metrics::TORRENT_UPLOAD_BYTES
            .collect()
            .iter()
            .flat_map(|family| family.get_metric().to_vec())
            .map(|metric| metric.get_label()[0].get_value().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let client = Arc::new(MockTorrentClient::new());
        let snapshot = ClientSnapshot::new(client, Duration::from_secs(1));

        assert!(snapshot.items().await.is_empty());
        assert_eq!(*snapshot.session().await, SessionStats::default());

        let status = snapshot.status().await;
        assert_eq!(status.torrents, 0);
        assert!(status.session.refreshed_at.is_none());
        assert!(status.items.refreshed_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_fills_both_caches() {
        let client = Arc::new(MockTorrentClient::with_items(vec![
            fixtures::item(1, "/data").with_labels(["anime"]),
            fixtures::item(2, "/data"),
        ]));
        client.set_session_stats(session(1, 2, 30, 40)).await;
        client.set_transfer(1, 500, 250).await;
        let snapshot = ClientSnapshot::new(client.clone(), Duration::from_secs(1));

        snapshot.refresh().await.unwrap();

        assert_eq!(snapshot.session().await.cumulative.uploaded_bytes, 30);
        let items = snapshot.items().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].uploaded_ever, 500);
        assert!(items[0].labels.contains("anime"));
        assert_eq!(client.stats_count().await, 2);
        assert_eq!(client.list_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_values() {
        let client = Arc::new(MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]));
        client.set_session_stats(session(1, 2, 3, 4)).await;
        let snapshot = ClientSnapshot::new(client.clone(), Duration::from_secs(1));
        snapshot.refresh().await.unwrap();

        client.set_session_stats(session(9, 9, 9, 9)).await;
        client.insert_item(fixtures::item(2, "/data")).await;
        client.fail_stats(2).await;
        assert!(snapshot.refresh().await.is_err());

        assert_eq!(*snapshot.session().await, session(1, 2, 3, 4));
        assert_eq!(snapshot.items().await.len(), 1);
        let status = snapshot.status().await;
        assert!(status.session.last_error.is_some());
        assert!(status.items.last_error.is_some());

        snapshot.refresh().await.unwrap();
        assert_eq!(snapshot.items().await.len(), 2);
        assert!(snapshot.status().await.items.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_client_hits_deadline() {
        let client = Arc::new(MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]));
        client.set_delay(Duration::from_secs(30)).await;
        let snapshot = ClientSnapshot::new(client, Duration::from_millis(100));

        let err = snapshot.refresh().await.unwrap_err();
        assert_eq!(err, CacheError::DeadlineExceeded(Duration::from_millis(100)));
        assert!(snapshot.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_export_metrics_tracks_torrents() {
        let first = fixtures::item(9001, "/data");
        let second = fixtures::item(9002, "/data");
        let client = Arc::new(MockTorrentClient::with_items(vec![
            first.clone(),
            second.clone(),
        ]));
        client.set_session_stats(session(11, 22, 33, 44)).await;
        client.set_transfer(9001, 700, 300).await;
        let snapshot = ClientSnapshot::new(client.clone(), Duration::from_secs(1));

        snapshot.refresh().await.unwrap();
        snapshot.export_metrics().await;

        assert_eq!(metrics::SESSION_UPLOAD_BYTES.get(), 11);
        assert_eq!(metrics::SESSION_DOWNLOAD_BYTES.get(), 22);
        assert_eq!(metrics::TOTAL_UPLOAD_BYTES.get(), 33);
        assert_eq!(metrics::TOTAL_DOWNLOAD_BYTES.get(), 44);
        assert_eq!(
            metrics::TORRENT_UPLOAD_BYTES
                .with_label_values(&[first.hash.as_str()])
                .get(),
            700
        );
        assert_eq!(
            metrics::TORRENT_DOWNLOAD_BYTES
                .with_label_values(&[first.hash.as_str()])
                .get(),
            300
        );
        assert_eq!(metrics::TORRENTS_BY_STATUS.with_label_values(&["seeding"]).get(), 2);

        client.remove_item(9002).await;
        snapshot.refresh().await.unwrap();
        snapshot.export_metrics().await;

        let hashes = exported_hashes();
        assert!(hashes.contains(&first.hash));
        assert!(!hashes.contains(&second.hash));
    }
}
