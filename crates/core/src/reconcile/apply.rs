//! Sending one mutation with a deadline.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use crate::metrics;
use crate::torrent_client::{Item, TorrentClientError};

use super::{MutationKind, ReconcileError, ReconcileOutcome};

/// Await `call` for at most `timeout`, then log and count the result.
///
/// Failures are logged with the torrent identity and the payload sent.
pub(super) async fn apply_mutation<Fut>(
    kind: MutationKind,
    item: &Item,
    payload: Vec<String>,
    timeout: Duration,
    call: Fut,
) -> Result<ReconcileOutcome, ReconcileError>
where
    Fut: Future<Output = Result<(), TorrentClientError>>,
{
    let result = tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(TorrentClientError::Timeout));

    match result {
        Ok(()) => {
            metrics::MUTATIONS
                .with_label_values(&[kind.as_str(), "success"])
                .inc();
            info!(
                hash = %item.hash,
                name = %item.name,
                kind = %kind,
                payload = ?payload,
                "Applied mutation"
            );
            Ok(ReconcileOutcome::Applied)
        }
        Err(e) => {
            metrics::MUTATIONS
                .with_label_values(&[kind.as_str(), "failed"])
                .inc();
            error!(
                hash = %item.hash,
                name = %item.name,
                kind = %kind,
                payload = ?payload,
                error = %e,
                "Failed to apply mutation"
            );
            Err(ReconcileError::Mutation {
                item: item.hash.clone(),
                kind,
                payload,
                source: e,
            })
        }
    }
}
