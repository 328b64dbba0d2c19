pub mod cache;
pub mod catalogue;
pub mod config;
pub mod metrics;
pub mod reconcile;
pub mod retry;
pub mod snapshot;
pub mod testing;
pub mod torrent_client;

pub use cache::{CacheError, CacheStatus, SnapshotCache};
pub use catalogue::{
    CatalogueConfig, CatalogueError, CatalogueStatus, HttpTrackerSource, TrackerCatalogue,
    TrackerSource,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use reconcile::{
    LabelPolicy, LabelReconciler, LabelRule, LoopState, PassReport, ReconcileError,
    ReconcileOutcome, ReconciliationLoop, ReconcilerConfig, ReconcilerStatus, TrackerReconciler,
};
pub use retry::{RetryConfig, RetryPolicy};
pub use snapshot::{ClientSnapshot, SnapshotStatus};
pub use torrent_client::{
    Item, ItemStats, LabelSet, SessionStats, TorrentClient, TorrentClientError, TrackerSet,
    TransferStats, TransmissionClient,
};
