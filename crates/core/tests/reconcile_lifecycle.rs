//! Reconciliation integration tests.
//!
//! These tests drive the catalogue, both reconcilers and the loop together
//! against mock collaborators:
//! catalogue fetch -> list torrents -> add trackers -> set labels

use std::sync::Arc;
use std::time::Duration;

use steward_core::{
    testing::{fixtures, MockTorrentClient, MockTrackerSource, RecordedCall},
    CatalogueError, LabelPolicy, LabelRule, LoopState, ReconcilerConfig, ReconciliationLoop,
    RetryConfig, RetryPolicy, TorrentClient, TrackerCatalogue,
};

/// Test helper wiring mocks into a loop.
struct TestHarness {
    client: Arc<MockTorrentClient>,
    source: Arc<MockTrackerSource>,
    reconciler: ReconciliationLoop,
}

impl TestHarness {
    fn new(client: MockTorrentClient, source: MockTrackerSource, policy: LabelPolicy) -> Self {
        Self::with_intervals(client, source, policy, 60, Duration::from_secs(3600))
    }

    fn with_intervals(
        client: MockTorrentClient,
        source: MockTrackerSource,
        policy: LabelPolicy,
        pass_interval_secs: u64,
        refresh_interval: Duration,
    ) -> Self {
        let client = Arc::new(client);
        let source = Arc::new(source);

        let catalogue = Arc::new(TrackerCatalogue::new(
            source.clone(),
            RetryPolicy::new(2, Duration::from_millis(10)),
            Duration::from_secs(1),
        ));
        let config = ReconcilerConfig {
            pass_interval_secs,
            retry: RetryConfig {
                attempts: 2,
                delay_ms: 10,
            },
            ..Default::default()
        };
        let reconciler = ReconciliationLoop::new(
            config,
            refresh_interval,
            client.clone(),
            catalogue,
            policy,
        );

        Self {
            client,
            source,
            reconciler,
        }
    }
}

fn anime_policy() -> LabelPolicy {
    LabelPolicy::new([LabelRule::new("anime", "/data/anime")])
}

#[tokio::test]
async fn test_missing_tracker_added_once() {
    let harness = TestHarness::new(
        MockTorrentClient::with_items(vec![fixtures::item(1, "/data").with_trackers(["http://a"])]),
        MockTrackerSource::with_lines(["http://a", "http://b"]),
        LabelPolicy::default(),
    );
    harness.reconciler.catalogue().refresh().await.unwrap();

    harness.reconciler.run_pass().await.unwrap();
    assert_eq!(
        harness.client.recorded_calls().await,
        vec![RecordedCall::AddTrackers {
            id: 1,
            trackers: vec!["http://b".to_string()],
        }]
    );

    // Second pass sees the torrent as compliant
    harness.client.clear_recorded().await;
    let report = harness.reconciler.run_pass().await.unwrap();
    assert!(harness.client.recorded_calls().await.is_empty());
    assert!(!report.changed_anything());
}

#[tokio::test]
async fn test_trackers_never_removed() {
    let harness = TestHarness::new(
        MockTorrentClient::with_items(vec![
            fixtures::item(1, "/data").with_trackers(["http://private", "http://old"])
        ]),
        MockTrackerSource::with_lines(["http://a"]),
        LabelPolicy::default(),
    );
    harness.reconciler.catalogue().refresh().await.unwrap();

    let before = harness.client.item(1).await.unwrap().trackers;
    harness.reconciler.run_pass().await.unwrap();
    let after = harness.client.item(1).await.unwrap().trackers;

    assert!(after.is_superset(&before));
    assert!(after.contains("http://a"));
}

#[tokio::test]
async fn test_compliant_labels_are_left_alone() {
    let harness = TestHarness::new(
        MockTorrentClient::with_items(vec![
            fixtures::item(1, "/data/anime/show1").with_labels(["anime", "manual-review"])
        ]),
        MockTrackerSource::new(),
        anime_policy(),
    );

    let report = harness.reconciler.run_pass().await.unwrap();
    assert_eq!(report.labels_set, 0);
    assert!(harness.client.recorded_calls().await.is_empty());
}

#[tokio::test]
async fn test_moved_torrent_relabelled_keeping_foreign_label() {
    let harness = TestHarness::new(
        MockTorrentClient::with_items(vec![
            fixtures::item(1, "/data/movies/show1").with_labels(["anime", "manual-review"])
        ]),
        MockTrackerSource::new(),
        anime_policy(),
    );

    harness.reconciler.run_pass().await.unwrap();
    assert_eq!(
        harness.client.recorded_calls().await,
        vec![RecordedCall::SetLabels {
            id: 1,
            labels: vec!["manual-review".to_string()],
        }]
    );

    harness.client.clear_recorded().await;
    harness.reconciler.run_pass().await.unwrap();
    assert!(harness.client.recorded_calls().await.is_empty());
}

#[tokio::test]
async fn test_tracker_failure_still_sets_labels() {
    let harness = TestHarness::new(
        MockTorrentClient::with_items(vec![fixtures::item(1, "/data/anime/x")]),
        MockTrackerSource::with_lines(["http://a"]),
        anime_policy(),
    );
    harness.reconciler.catalogue().refresh().await.unwrap();
    harness.client.fail_add_trackers(1, "tracker rejected").await;

    let report = harness.reconciler.run_pass().await.unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.labels_set, 1);
    assert!(harness.client.item(1).await.unwrap().labels.contains("anime"));
}

#[tokio::test]
async fn test_concurrent_items_each_reconciled() {
    let items = (1..=20).map(|id| fixtures::item(id, "/data/anime/x")).collect();
    let client = MockTorrentClient::with_items(items);
    let source = Arc::new(MockTrackerSource::with_lines(["http://a"]));
    let client = Arc::new(client);

    let catalogue = Arc::new(TrackerCatalogue::new(
        source.clone(),
        RetryPolicy::once(),
        Duration::from_secs(1),
    ));
    catalogue.refresh().await.unwrap();
    let reconciler = ReconciliationLoop::new(
        ReconcilerConfig {
            max_concurrent_items: 8,
            ..Default::default()
        },
        Duration::from_secs(3600),
        client.clone(),
        catalogue,
        anime_policy(),
    );

    let report = reconciler.run_pass().await.unwrap();
    assert_eq!(report.items, 20);
    assert_eq!(report.trackers_added, 20);
    assert_eq!(report.labels_set, 20);
    assert_eq!(client.recorded_calls().await.len(), 40);

    for item in client.list_items().await.unwrap() {
        assert!(item.trackers.contains("http://a"));
        assert!(item.labels.contains("anime"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_loop_runs_passes_on_schedule() {
    let harness = TestHarness::with_intervals(
        MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]),
        MockTrackerSource::with_lines(["http://a"]),
        LabelPolicy::default(),
        60,
        Duration::from_secs(3600),
    );

    harness.reconciler.start().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.reconciler.status().await.passes, 1);
    assert_eq!(harness.client.recorded_calls().await.len(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.reconciler.status().await.passes, 2);
    // Already compliant, nothing more sent
    assert_eq!(harness.client.recorded_calls().await.len(), 1);

    harness.reconciler.stop().await;
    assert_eq!(harness.reconciler.status().await.state, LoopState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_catalogue_refresh_feeds_later_passes() {
    let harness = TestHarness::with_intervals(
        MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]),
        MockTrackerSource::with_lines(["http://a"]),
        LabelPolicy::default(),
        60,
        Duration::from_secs(90),
    );

    harness.reconciler.start().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    harness.source.set_lines(["http://a", "http://b"]).await;

    // Refresh at 90s, pass at 120s picks up the new tracker
    tokio::time::sleep(Duration::from_secs(125)).await;
    harness.reconciler.stop().await;

    assert_eq!(harness.source.fetch_count(), 2);
    let trackers = harness.client.item(1).await.unwrap().trackers;
    assert!(trackers.contains("http://b"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_serving_previous_catalogue() {
    let harness = TestHarness::with_intervals(
        MockTorrentClient::with_items(vec![fixtures::item(1, "/data")]),
        MockTrackerSource::with_lines(["http://a"]),
        LabelPolicy::default(),
        60,
        Duration::from_secs(90),
    );

    harness.reconciler.start().await;
    harness
        .source
        .fail_next(10, CatalogueError::Status(503))
        .await;

    tokio::time::sleep(Duration::from_secs(100)).await;
    let status = harness.reconciler.catalogue().status().await;
    assert_eq!(status.trackers, 1);
    assert!(status.last_error.is_some());

    // A torrent added later still gets the cached tracker
    harness.client.insert_item(fixtures::item(2, "/data")).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    harness.reconciler.stop().await;

    assert!(harness
        .client
        .item(2)
        .await
        .unwrap()
        .trackers
        .contains("http://a"));
}
