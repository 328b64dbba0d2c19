//! Types for the tracker catalogue.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while fetching the catalogue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogueError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("tracker list returned HTTP {0}")]
    Status(u16),

    #[error("tracker list fetch timed out")]
    Timeout,
}

/// Source of the raw tracker list.
#[async_trait]
pub trait TrackerSource: Send + Sync {
    /// Where the list comes from, for logging.
    fn location(&self) -> &str;

    /// Fetch the raw list, one entry per line.
    async fn fetch_tracker_list(&self) -> Result<Vec<String>, CatalogueError>;
}
