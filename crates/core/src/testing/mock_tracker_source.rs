//! Mock tracker list source for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalogue::{CatalogueError, TrackerSource};

/// Mock implementation of the TrackerSource trait.
///
/// Serves a fixed list of lines. Failures and latency can be injected.
#[derive(Debug, Default)]
pub struct MockTrackerSource {
    lines: Arc<RwLock<Vec<String>>>,
    /// Remaining fetches that fail, and the error they fail with.
    failures: Arc<RwLock<Option<(usize, CatalogueError)>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    fetches: AtomicUsize,
}

impl MockTrackerSource {
    /// Create a source that serves an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that serves the given lines.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Arc::new(RwLock::new(lines.into_iter().map(Into::into).collect())),
            ..Self::default()
        }
    }

    /// Replace the served lines.
    pub async fn set_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.lines.write().await = lines.into_iter().map(Into::into).collect();
    }

    /// Make the next `count` fetches fail with `error`.
    pub async fn fail_next(&self, count: usize, error: CatalogueError) {
        *self.failures.write().await = (count > 0).then_some((count, error));
    }

    /// Delay every fetch by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Number of fetches attempted so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackerSource for MockTrackerSource {
    fn location(&self) -> &str {
        "mock://trackers"
    }

    async fn fetch_tracker_list(&self) -> Result<Vec<String>, CatalogueError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.failures.write().await;
            if let Some((remaining, error)) = failures.as_mut() {
                let error = error.clone();
                *remaining -= 1;
                if *remaining == 0 {
                    *failures = None;
                }
                return Err(error);
            }
        }

        Ok(self.lines.read().await.clone())
    }
}
