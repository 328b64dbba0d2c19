//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait covering the three remote
//! operations reconciliation needs: list items, add trackers, set labels.

mod transmission;
mod types;

pub use transmission::TransmissionClient;
pub use types::*;
