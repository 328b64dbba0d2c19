//! Mock torrent client for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::torrent_client::{
    Item, ItemStats, SessionStats, TorrentClient, TorrentClientError, TransferStats,
};

/// A recorded mutation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    AddTrackers { id: i64, trackers: Vec<String> },
    SetLabels { id: i64, labels: Vec<String> },
}

impl RecordedCall {
    /// Id of the torrent the call targeted.
    pub fn id(&self) -> i64 {
        match self {
            RecordedCall::AddTrackers { id, .. } | RecordedCall::SetLabels { id, .. } => *id,
        }
    }
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Holds torrents and applies mutations to them, like a daemon would
/// - Records every mutation for assertions
/// - Serves scripted session and per-torrent transfer stats
/// - Simulates list failures, per-torrent failures and slow calls
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::with_items(vec![item]);
///
/// client.add_trackers(1, &["http://b".to_string()]).await?;
///
/// let calls = client.recorded_calls().await;
/// assert_eq!(calls.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockTorrentClient {
    /// Current torrents by id.
    items: Arc<RwLock<BTreeMap<i64, Item>>>,
    /// Recorded mutations with timestamps.
    calls: Arc<RwLock<Vec<(RecordedCall, DateTime<Utc>)>>>,
    /// Number of list calls made.
    list_calls: Arc<RwLock<usize>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    /// Remaining list calls that fail.
    list_failures: Arc<RwLock<usize>>,
    /// Torrent ids whose mutations always fail, with the message used.
    failing_items: Arc<RwLock<HashMap<i64, String>>>,
    /// Torrent ids whose add-trackers calls always fail.
    failing_tracker_adds: Arc<RwLock<HashMap<i64, String>>>,
    /// Latency added to every call.
    delay: Arc<RwLock<Option<Duration>>>,
    /// Daemon-wide counters served by `session_stats`.
    session: Arc<RwLock<SessionStats>>,
    /// Per-torrent counters by id, zero when unset.
    transfers: Arc<RwLock<HashMap<i64, TransferStats>>>,
    /// Number of stats calls made (session and per-torrent).
    stats_calls: Arc<RwLock<usize>>,
    /// Remaining stats calls that fail.
    stats_failures: Arc<RwLock<usize>>,
}

impl MockTorrentClient {
    /// Create a new mock torrent client with no torrents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock client holding the given torrents.
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: Arc::new(RwLock::new(
                items.into_iter().map(|item| (item.id, item)).collect(),
            )),
            ..Self::default()
        }
    }

    /// Add or replace a torrent.
    pub async fn insert_item(&self, item: Item) {
        self.items.write().await.insert(item.id, item);
    }

    /// Current state of a torrent.
    pub async fn item(&self, id: i64) -> Option<Item> {
        self.items.read().await.get(&id).cloned()
    }

    /// Get all recorded mutations, oldest first.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls
            .read()
            .await
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    /// Clear recorded mutations.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Number of list calls made so far.
    pub async fn list_count(&self) -> usize {
        *self.list_calls.read().await
    }

    /// Make the next operation fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make the next `count` list calls fail.
    pub async fn fail_list(&self, count: usize) {
        *self.list_failures.write().await = count;
    }

    /// Make every mutation of torrent `id` fail.
    pub async fn fail_item(&self, id: i64, message: impl Into<String>) {
        self.failing_items.write().await.insert(id, message.into());
    }

    /// Make add-trackers calls for torrent `id` fail, leaving set-labels alone.
    pub async fn fail_add_trackers(&self, id: i64, message: impl Into<String>) {
        self.failing_tracker_adds
            .write()
            .await
            .insert(id, message.into());
    }

    /// Set the counters returned by `session_stats`.
    pub async fn set_session_stats(&self, stats: SessionStats) {
        *self.session.write().await = stats;
    }

    /// Set the transfer counters of torrent `id`.
    pub async fn set_transfer(&self, id: i64, uploaded_bytes: u64, downloaded_bytes: u64) {
        self.transfers.write().await.insert(
            id,
            TransferStats {
                uploaded_bytes,
                downloaded_bytes,
            },
        );
    }

    /// Remove a torrent, as if it was deleted from the daemon.
    pub async fn remove_item(&self, id: i64) {
        self.items.write().await.remove(&id);
    }

    /// Make the next `count` stats calls fail.
    pub async fn fail_stats(&self, count: usize) {
        *self.stats_failures.write().await = count;
    }

    /// Number of stats calls made so far.
    pub async fn stats_count(&self) -> usize {
        *self.stats_calls.read().await
    }

    /// Add latency to every call.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    async fn simulate_latency(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn check_stats_failure(&self) -> Result<(), TorrentClientError> {
        *self.stats_calls.write().await += 1;
        self.simulate_latency().await;

        let mut failures = self.stats_failures.write().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(TorrentClientError::ConnectionFailed(
                "mock daemon unreachable".to_string(),
            ));
        }
        Ok(())
    }

    async fn check_next_error(&self) -> Result<(), TorrentClientError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Record a mutation, then fail it if an error is queued, the torrent is
    /// marked failing, or it is unknown.
    async fn record(&self, call: RecordedCall) -> Result<(), TorrentClientError> {
        let id = call.id();
        let is_tracker_add = matches!(call, RecordedCall::AddTrackers { .. });
        self.calls.write().await.push((call, Utc::now()));

        self.check_next_error().await?;
        if let Some(message) = self.failing_items.read().await.get(&id) {
            return Err(TorrentClientError::ApiError(message.clone()));
        }
        if is_tracker_add {
            if let Some(message) = self.failing_tracker_adds.read().await.get(&id) {
                return Err(TorrentClientError::ApiError(message.clone()));
            }
        }
        if !self.items.read().await.contains_key(&id) {
            return Err(TorrentClientError::ApiError(format!("no torrent with id {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_items(&self) -> Result<Vec<Item>, TorrentClientError> {
        *self.list_calls.write().await += 1;
        self.simulate_latency().await;
        self.check_next_error().await?;

        {
            let mut failures = self.list_failures.write().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(TorrentClientError::ConnectionFailed(
                    "mock daemon unreachable".to_string(),
                ));
            }
        }

        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn add_trackers(&self, id: i64, trackers: &[String]) -> Result<(), TorrentClientError> {
        self.simulate_latency().await;
        self.record(RecordedCall::AddTrackers {
            id,
            trackers: trackers.to_vec(),
        })
        .await?;

        if let Some(item) = self.items.write().await.get_mut(&id) {
            item.trackers.extend(trackers.iter().cloned());
        }
        Ok(())
    }

    async fn set_labels(&self, id: i64, labels: &[String]) -> Result<(), TorrentClientError> {
        self.simulate_latency().await;
        self.record(RecordedCall::SetLabels {
            id,
            labels: labels.to_vec(),
        })
        .await?;

        if let Some(item) = self.items.write().await.get_mut(&id) {
            item.labels = labels.iter().cloned().collect();
        }
        Ok(())
    }

    async fn session_stats(&self) -> Result<SessionStats, TorrentClientError> {
        self.check_stats_failure().await?;
        Ok(*self.session.read().await)
    }

    async fn item_stats(&self) -> Result<Vec<ItemStats>, TorrentClientError> {
        self.check_stats_failure().await?;

        let transfers = self.transfers.read().await;
        Ok(self
            .items
            .read()
            .await
            .values()
            .map(|item| {
                let transfer = transfers.get(&item.id).copied().unwrap_or_default();
                ItemStats {
                    hash: item.hash.clone(),
                    name: item.name.clone(),
                    status: "seeding".to_string(),
                    labels: item.labels.clone(),
                    uploaded_ever: transfer.uploaded_bytes,
                    downloaded_ever: transfer.downloaded_bytes,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_mutations_update_items() {
        let client = MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]);

        client
            .add_trackers(1, &["http://a".to_string()])
            .await
            .unwrap();
        client
            .set_labels(1, &["anime".to_string()])
            .await
            .unwrap();

        let item = client.item(1).await.unwrap();
        assert!(item.trackers.contains("http://a"));
        assert!(item.labels.contains("anime"));
        assert_eq!(client.recorded_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_next_error_is_consumed() {
        let client = MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]);
        client.set_next_error(TorrentClientError::Timeout).await;

        assert!(client.list_items().await.is_err());
        assert_eq!(client.list_items().await.unwrap().len(), 1);
        assert_eq!(client.list_count().await, 2);
    }

    #[tokio::test]
    async fn test_failing_item_is_recorded_and_unchanged() {
        let client = MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]);
        client.fail_item(1, "torrent locked").await;

        let err = client
            .set_labels(1, &["x".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("torrent locked"));
        assert!(client.item(1).await.unwrap().labels.is_empty());
        assert_eq!(client.recorded_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_item_stats_follow_items() {
        let client = MockTorrentClient::with_items(vec![
            fixtures::item(1, "/data"),
            fixtures::item(2, "/data"),
        ]);
        client.set_transfer(1, 300, 100).await;
        client.fail_stats(1).await;

        assert!(client.item_stats().await.is_err());
        let stats = client.item_stats().await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].uploaded_ever, 300);
        assert_eq!(stats[1].uploaded_ever, 0);
        assert_eq!(client.stats_count().await, 2);
        assert_eq!(client.list_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_item_fails() {
        let client = MockTorrentClient::new();
        assert!(client.add_trackers(7, &[]).await.is_err());
    }
}
