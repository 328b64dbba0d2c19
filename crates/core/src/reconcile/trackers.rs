//! Additive tracker reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::torrent_client::{Item, TorrentClient, TrackerSet};

use super::apply::apply_mutation;
use super::{MutationKind, ReconcileError, ReconcileOutcome};

/// Trackers in `wanted` that `have` lacks.
pub fn diff(wanted: &TrackerSet, have: &TrackerSet) -> TrackerSet {
    wanted.difference(have).cloned().collect()
}

/// Adds catalogue trackers a torrent is missing. Never removes any.
pub struct TrackerReconciler {
    client: Arc<dyn TorrentClient>,
    timeout: Duration,
}

impl TrackerReconciler {
    pub fn new(client: Arc<dyn TorrentClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Make sure `item` carries every tracker in `wanted`.
    ///
    /// Sends at most one add-trackers call, holding exactly the missing
    /// trackers. Sends nothing when none are missing.
    pub async fn reconcile(
        &self,
        item: &Item,
        wanted: &TrackerSet,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let missing = diff(wanted, &item.trackers);
        if missing.is_empty() {
            return Ok(ReconcileOutcome::Compliant);
        }

        debug!(hash = %item.hash, missing = missing.len(), "Torrent is missing trackers");
        let payload: Vec<String> = missing.into_iter().collect();
        apply_mutation(
            MutationKind::AddTrackers,
            item,
            payload.clone(),
            self.timeout,
            self.client.add_trackers(item.id, &payload),
        )
        .await
    }
}
