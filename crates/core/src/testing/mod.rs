//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits,
//! allowing the reconcilers and the loop to be tested without a running
//! torrent daemon or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use steward_core::testing::{fixtures, MockTorrentClient, MockTrackerSource};
//!
//! let client = MockTorrentClient::with_items(vec![fixtures::item(1, "/data/anime/show1")]);
//! let source = MockTrackerSource::with_lines(["http://a/announce"]);
//!
//! // Run a pass...
//! assert_eq!(client.recorded_calls().await.len(), 1);
//! ```

mod mock_torrent_client;
mod mock_tracker_source;

pub use mock_torrent_client::{MockTorrentClient, RecordedCall};
pub use mock_tracker_source::MockTrackerSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::torrent_client::{Item, TrackerSet};

    /// Create a torrent with a hash derived from its id.
    pub fn item(id: i64, download_dir: &str) -> Item {
        Item::new(id, format!("{:040x}", id), download_dir).with_name(format!("Torrent {}", id))
    }

    /// Build a tracker set from string literals.
    pub fn trackers<const N: usize>(urls: [&str; N]) -> TrackerSet {
        urls.iter().map(|u| u.to_string()).collect()
    }
}
