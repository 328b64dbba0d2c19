//! Tracker and label reconciliation.
//!
//! Each pass lists every torrent once, then per torrent:
//! - **Trackers**: additive only, adds catalogue entries the torrent lacks
//! - **Labels**: replaces the label set when managed labels drift, keeping
//!   labels no rule owns
//!
//! Both reconcilers compare sets before calling the daemon, so a compliant
//! torrent costs no mutation.

mod apply;
mod config;
mod labels;
mod runner;
mod trackers;
mod types;

pub use config::ReconcilerConfig;
pub use labels::{LabelPolicy, LabelReconciler, LabelRule};
pub use runner::ReconciliationLoop;
pub use trackers::{diff, TrackerReconciler};
pub use types::{
    LoopState, MutationKind, PassReport, ReconcileError, ReconcileOutcome, ReconcilerStatus,
};
