//! Tracker catalogue.
//!
//! Downloads a public list of announce URLs, filters out unusable entries and
//! keeps the result in a [`SnapshotCache`](crate::cache::SnapshotCache) that the
//! reconciler reads on every pass.

mod config;
mod filter;
mod http;
mod store;
mod types;

pub use config::CatalogueConfig;
pub use filter::{default_denied, filter_trackers, DEFAULT_DENIED_TRACKERS};
pub use http::HttpTrackerSource;
pub use store::{CatalogueStatus, TrackerCatalogue};
pub use types::{CatalogueError, TrackerSource};
