//! HTTP tracker list source.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{CatalogueError, TrackerSource};

/// Downloads a plain-text tracker list over HTTP.
pub struct HttpTrackerSource {
    client: Client,
    url: String,
}

impl HttpTrackerSource {
    /// Create a source for `url`. `timeout` bounds every request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogueError> {
        let client = Client::builder()
            .user_agent(concat!("steward/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogueError::Http(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TrackerSource for HttpTrackerSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch_tracker_list(&self) -> Result<Vec<String>, CatalogueError> {
        debug!("Fetching tracker list from {}", self.url);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogueError::Timeout
            } else {
                CatalogueError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogueError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogueError::Http(e.to_string()))?;

        Ok(body.lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location() {
        let source =
            HttpTrackerSource::new("https://trackerslist.com/all.txt", Duration::from_secs(1))
                .unwrap();
        assert_eq!(source.location(), "https://trackerslist.com/all.txt");
    }

    #[tokio::test]
    async fn test_unreachable_source_is_transport_error() {
        // Port 9 (discard) on localhost is closed on any sane test host
        let source =
            HttpTrackerSource::new("http://127.0.0.1:9/all.txt", Duration::from_secs(2)).unwrap();
        let err = source.fetch_tracker_list().await.unwrap_err();
        assert!(matches!(err, CatalogueError::Http(_) | CatalogueError::Timeout));
    }
}
