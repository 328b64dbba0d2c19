//! Lock-guarded snapshot of a remotely produced value.
//!
//! Readers clone an `Arc` to the current snapshot under a read lock, so a
//! slow reader never holds the lock while it works. A refresh runs its
//! producer outside the lock and only takes the write lock to swap the new
//! snapshot in. A failed refresh keeps the previous value and records the
//! error for health reporting.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from a cache refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("producer failed: {0}")]
    Producer(String),

    #[error("refresh exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Health view of a cache, for observability.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStatus {
    /// When the value was last replaced successfully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Error of the most recent refresh, cleared by the next success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl CacheStatus {
    /// Seconds since the last successful refresh.
    pub fn age_secs(&self) -> Option<i64> {
        self.refreshed_at
            .map(|at| (Utc::now() - at).num_seconds().max(0))
    }
}

struct Snapshot<T> {
    value: Arc<T>,
    status: CacheStatus,
}

/// Holds one value of type `T`, replaced wholesale on every successful refresh.
pub struct SnapshotCache<T> {
    inner: RwLock<Snapshot<T>>,
}

impl<T: Default> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> SnapshotCache<T> {
    /// Create a cache holding `initial` that has never been refreshed.
    pub fn new(initial: T) -> Self {
        Self {
            inner: RwLock::new(Snapshot {
                value: Arc::new(initial),
                status: CacheStatus::default(),
            }),
        }
    }

    /// The most recently produced value.
    pub async fn get(&self) -> Arc<T> {
        Arc::clone(&self.inner.read().await.value)
    }

    /// Refresh timestamp and last error.
    pub async fn status(&self) -> CacheStatus {
        self.inner.read().await.status.clone()
    }

    /// Swap in `value` and clear any recorded error.
    pub async fn replace(&self, value: T) {
        let value = Arc::new(value);
        let mut inner = self.inner.write().await;
        inner.value = value;
        inner.status = CacheStatus {
            refreshed_at: Some(Utc::now()),
            last_error: None,
        };
    }

    /// Run `producer` under `deadline` and replace the value on success.
    ///
    /// On failure or timeout the previous value stays in place and the error
    /// is recorded.
    pub async fn refresh<Fut, E>(&self, deadline: Duration, producer: Fut) -> Result<(), CacheError>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let error = match tokio::time::timeout(deadline, producer).await {
            Ok(Ok(value)) => {
                self.replace(value).await;
                return Ok(());
            }
            Ok(Err(e)) => CacheError::Producer(e.to_string()),
            Err(_) => CacheError::DeadlineExceeded(deadline),
        };

        self.inner.write().await.status.last_error = Some(error.to_string());
        Err(error)
    }
}
