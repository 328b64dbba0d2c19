use std::sync::Arc;
use steward_core::{Config, ReconciliationLoop, SanitizedConfig, TrackerCatalogue};

/// Shared application state
pub struct AppState {
    config: Config,
    catalogue: Arc<TrackerCatalogue>,
    reconciler: Option<Arc<ReconciliationLoop>>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalogue: Arc<TrackerCatalogue>,
        reconciler: Option<Arc<ReconciliationLoop>>,
    ) -> Self {
        Self {
            config,
            catalogue,
            reconciler,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn catalogue(&self) -> &TrackerCatalogue {
        &self.catalogue
    }

    /// The reconciliation loop, if a torrent client is configured.
    pub fn reconciler(&self) -> Option<&ReconciliationLoop> {
        self.reconciler.as_deref()
    }
}
