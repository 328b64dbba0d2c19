//! The reconciliation loop: catalogue refresh and reconciliation passes on
//! two independent timers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::catalogue::TrackerCatalogue;
use crate::metrics;
use crate::retry::RetryPolicy;
use crate::snapshot::ClientSnapshot;
use crate::torrent_client::{Item, TorrentClient, TorrentClientError, TrackerSet};

use super::{
    LabelPolicy, LabelReconciler, LoopState, PassReport, ReconcileError, ReconcileOutcome,
    ReconcilerConfig, ReconcilerStatus, TrackerReconciler,
};

/// Shortest period either timer runs at.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Per-item tally folded into a [`PassReport`].
#[derive(Debug, Default)]
struct ItemTally {
    trackers_added: bool,
    labels_set: bool,
    failures: usize,
}

/// Everything one pass needs, shared with the spawned pass task.
struct PassRunner {
    client: Arc<dyn TorrentClient>,
    catalogue: Arc<TrackerCatalogue>,
    trackers: TrackerReconciler,
    labels: LabelReconciler,
    list_retry: RetryPolicy,
    list_timeout: Duration,
    max_concurrent_items: usize,
    passes: AtomicU64,
    last_pass: RwLock<Option<PassReport>>,
    last_error: RwLock<Option<String>>,
}

impl PassRunner {
    async fn list_items(&self) -> Result<Vec<Item>, TorrentClientError> {
        self.list_retry
            .run("list torrents", || async {
                tokio::time::timeout(self.list_timeout, self.client.list_items())
                    .await
                    .unwrap_or(Err(TorrentClientError::Timeout))
            })
            .await
    }

    async fn run_pass(&self) -> Result<PassReport, ReconcileError> {
        let started = Instant::now();
        let started_at = Utc::now();
        self.passes.fetch_add(1, Ordering::Relaxed);

        let items = match self.list_items().await {
            Ok(items) => items,
            Err(e) => {
                metrics::RECONCILE_PASSES
                    .with_label_values(&["list_failed"])
                    .inc();
                let err = ReconcileError::ListFailed(e);
                *self.last_error.write().await = Some(err.to_string());
                return Err(err);
            }
        };
        metrics::ITEMS_SEEN.set(items.len() as i64);

        // One snapshot for the whole pass
        let wanted = self.catalogue.trackers().await;
        let wanted: &TrackerSet = &wanted;

        let futs: Vec<_> = items
            .iter()
            .map(|item| self.reconcile_item(item, wanted))
            .collect();
        let tallies: Vec<ItemTally> = stream::iter(futs)
            .buffer_unordered(self.max_concurrent_items.max(1))
            .collect()
            .await;

        let elapsed = started.elapsed();
        let report = PassReport {
            started_at,
            duration_ms: elapsed.as_millis() as u64,
            items: items.len(),
            trackers_added: tallies.iter().filter(|t| t.trackers_added).count(),
            labels_set: tallies.iter().filter(|t| t.labels_set).count(),
            failures: tallies.iter().map(|t| t.failures).sum(),
        };

        metrics::RECONCILE_PASSES
            .with_label_values(&["success"])
            .inc();
        metrics::RECONCILE_PASS_DURATION
            .with_label_values(&[])
            .observe(elapsed.as_secs_f64());

        *self.last_pass.write().await = Some(report.clone());
        *self.last_error.write().await = None;
        Ok(report)
    }

    /// Trackers then labels. A failure of one does not skip the other.
    async fn reconcile_item(&self, item: &Item, wanted: &TrackerSet) -> ItemTally {
        let mut tally = ItemTally::default();

        match self.trackers.reconcile(item, wanted).await {
            Ok(ReconcileOutcome::Applied) => tally.trackers_added = true,
            Ok(ReconcileOutcome::Compliant) => {}
            Err(_) => tally.failures += 1,
        }

        match self.labels.reconcile(item).await {
            Ok(ReconcileOutcome::Applied) => tally.labels_set = true,
            Ok(ReconcileOutcome::Compliant) => {}
            Err(_) => tally.failures += 1,
        }

        tally
    }
}

/// Keeps torrents in line with the tracker catalogue and label policy.
///
/// `start` fetches the catalogue once, then spawns three tasks: a catalogue
/// refresh on the catalogue interval, a reconciliation pass on the pass
/// interval and a client snapshot refresh on the snapshot interval. `stop`
/// signals all of them and waits for them to finish.
pub struct ReconciliationLoop {
    config: ReconcilerConfig,
    refresh_interval: Duration,
    runner: Arc<PassRunner>,
    snapshot: Arc<ClientSnapshot>,

    // Runtime state
    state: Arc<RwLock<LoopState>>,
    /// Set by `stop` while `start` is still fetching the catalogue.
    stop_requested: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ReconciliationLoop {
    /// Create a stopped loop.
    pub fn new(
        config: ReconcilerConfig,
        refresh_interval: Duration,
        client: Arc<dyn TorrentClient>,
        catalogue: Arc<TrackerCatalogue>,
        policy: LabelPolicy,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mutation_timeout = Duration::from_millis(config.mutation_timeout_ms);

        let snapshot = ClientSnapshot::new(
            Arc::clone(&client),
            Duration::from_millis(config.snapshot_timeout_ms),
        );

        let runner = PassRunner {
            trackers: TrackerReconciler::new(Arc::clone(&client), mutation_timeout),
            labels: LabelReconciler::new(Arc::clone(&client), Arc::new(policy), mutation_timeout),
            client,
            catalogue,
            list_retry: RetryPolicy::from(&config.retry),
            list_timeout: Duration::from_millis(config.list_timeout_ms),
            max_concurrent_items: config.max_concurrent_items,
            passes: AtomicU64::new(0),
            last_pass: RwLock::new(None),
            last_error: RwLock::new(None),
        };

        Self {
            config,
            refresh_interval,
            runner: Arc::new(runner),
            snapshot: Arc::new(snapshot),
            state: Arc::new(RwLock::new(LoopState::Stopped)),
            stop_requested: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
        }
    }

    /// The catalogue this loop reads from.
    pub fn catalogue(&self) -> &Arc<TrackerCatalogue> {
        &self.runner.catalogue
    }

    /// Transfer stats of the torrent client, refreshed while running.
    pub fn snapshot(&self) -> &Arc<ClientSnapshot> {
        &self.snapshot
    }

    /// Start the loop (spawns background tasks).
    ///
    /// Blocks on the initial catalogue fetch. If that fails the loop still
    /// starts, with whatever the catalogue held before.
    pub async fn start(&self) {
        {
            let mut state = self.state.write().await;
            if *state != LoopState::Stopped {
                warn!("Reconciliation loop already running");
                return;
            }
            *state = LoopState::Starting;
            self.stop_requested.store(false, Ordering::SeqCst);
        }

        info!(client = self.runner.client.name(), "Starting reconciliation loop");

        if let Err(e) = self.runner.catalogue.refresh().await {
            warn!("Initial catalogue fetch failed, starting anyway: {}", e);
        }

        {
            let mut state = self.state.write().await;
            if self.stop_requested.swap(false, Ordering::SeqCst) {
                *state = LoopState::Stopped;
                info!("Reconciliation loop stopped before it started");
                return;
            }

            let mut tasks = self.tasks.lock().await;
            tasks.push(self.spawn_refresh_loop());
            tasks.push(self.spawn_pass_loop());
            tasks.push(self.spawn_snapshot_loop());
            *state = LoopState::Running;
        }

        info!(
            pass_interval_secs = self.config.pass_interval_secs,
            snapshot_interval_secs = self.config.snapshot_interval_secs,
            refresh_interval_secs = self.refresh_interval.as_secs(),
            "Reconciliation loop started"
        );
    }

    /// Stop the loop gracefully.
    ///
    /// In-flight calls are not interrupted; each finishes or hits its own
    /// deadline before this returns. Called during `start`, it makes `start`
    /// return without spawning anything.
    pub async fn stop(&self) {
        {
            let state = self.state.read().await;
            match *state {
                LoopState::Running => {}
                LoopState::Starting => {
                    info!("Stop requested during startup");
                    self.stop_requested.store(true, Ordering::SeqCst);
                    return;
                }
                LoopState::Stopped => {
                    warn!("Reconciliation loop not running");
                    return;
                }
            }
        }

        info!("Stopping reconciliation loop");

        // Signal shutdown to all workers
        let _ = self.shutdown_tx.send(());

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                error!("Reconciliation task panicked: {}", e);
            }
        }

        *self.state.write().await = LoopState::Stopped;
        info!("Reconciliation loop stopped");
    }

    /// Get current loop status.
    pub async fn status(&self) -> ReconcilerStatus {
        ReconcilerStatus {
            state: *self.state.read().await,
            passes: self.runner.passes.load(Ordering::Relaxed),
            last_pass: self.runner.last_pass.read().await.clone(),
            last_error: self.runner.last_error.read().await.clone(),
        }
    }

    /// Run one reconciliation pass now, outside the schedule.
    pub async fn run_pass(&self) -> Result<PassReport, ReconcileError> {
        self.runner.run_pass().await
    }

    /// Spawn the catalogue refresh task. The first tick is one full period
    /// out since `start` just fetched.
    fn spawn_refresh_loop(&self) -> JoinHandle<()> {
        let catalogue = Arc::clone(&self.runner.catalogue);
        let period = self.refresh_interval.max(MIN_PERIOD);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Catalogue refresh loop started");
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("Catalogue refresh loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Failure is logged and counted by the catalogue
                        let _ = catalogue.refresh().await;
                    }
                }
            }
            info!("Catalogue refresh loop stopped");
        })
    }

    /// Spawn the reconciliation pass task. The first pass runs immediately.
    fn spawn_pass_loop(&self) -> JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let period = Duration::from_secs(self.config.pass_interval_secs).max(MIN_PERIOD);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Reconciliation pass loop started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("Reconciliation pass loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match runner.run_pass().await {
                            Ok(report) if report.changed_anything() => {
                                info!(
                                    items = report.items,
                                    trackers_added = report.trackers_added,
                                    labels_set = report.labels_set,
                                    failures = report.failures,
                                    "Reconciliation pass complete"
                                );
                            }
                            Ok(report) => {
                                debug!(items = report.items, "Reconciliation pass complete, nothing to do");
                            }
                            Err(e) => warn!("Reconciliation pass failed: {}", e),
                        }
                    }
                }
            }
            info!("Reconciliation pass loop stopped");
        })
    }

    /// Spawn the client snapshot task. The first refresh runs immediately.
    fn spawn_snapshot_loop(&self) -> JoinHandle<()> {
        let snapshot = Arc::clone(&self.snapshot);
        let period = Duration::from_secs(self.config.snapshot_interval_secs).max(MIN_PERIOD);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Client snapshot loop started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("Client snapshot loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Failure is logged and counted by the snapshot
                        let _ = snapshot.refresh().await;
                    }
                }
            }
            info!("Client snapshot loop stopped");
        })
    }
}
