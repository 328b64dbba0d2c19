//! Catalogue configuration.

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Configuration for the tracker catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueConfig {
    /// Newline-delimited tracker list to download.
    #[serde(default = "default_url")]
    pub url: String,

    /// Deadline for a single download attempt (milliseconds).
    /// Kept short so a slow source cannot hold up reconciliation.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// How often to refresh the catalogue (seconds).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Announce URLs to reject on top of the built-in deny-list.
    #[serde(default)]
    pub extra_denied: Vec<String>,

    /// Retry policy for each refresh.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_url() -> String {
    "https://trackerslist.com/all.txt".to_string()
}

fn default_fetch_timeout() -> u64 {
    1000 // 1 second
}

fn default_refresh_interval() -> u64 {
    3600 // 1 hour
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            fetch_timeout_ms: default_fetch_timeout(),
            refresh_interval_secs: default_refresh_interval(),
            extra_denied: Vec::new(),
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogueConfig::default();
        assert_eq!(config.url, "https://trackerslist.com/all.txt");
        assert_eq!(config.fetch_timeout_ms, 1000);
        assert_eq!(config.refresh_interval_secs, 3600);
        assert!(config.extra_denied.is_empty());
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.delay_ms, 1000);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            url = "http://127.0.0.1:8000/trackers.txt"
            fetch_timeout_ms = 250
            refresh_interval_secs = 60
            extra_denied = ["udp://bad:80/announce"]

            [retry]
            attempts = 2
            delay_ms = 10
        "#;
        let config: CatalogueConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.url, "http://127.0.0.1:8000/trackers.txt");
        assert_eq!(config.fetch_timeout_ms, 250);
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.extra_denied, vec!["udp://bad:80/announce"]);
        assert_eq!(config.retry.attempts, 2);
        assert_eq!(config.retry.delay_ms, 10);
    }
}
