//! Roster reconciliation for rosterwatch.
//!
//! The pure stages turn scraped [`SourceTables`] into matched pairs:
//! - [`categories`]: general table → category lookup table
//! - [`normalizer`]: sub-sources → one roster with back-filled categories
//! - [`pairing`]: name cells → two-token pairs
//! - [`matcher`]: pairs → accepted matches under the similarity cutoff
//! - [`differ`]: matches → new / recurring against the previous snapshot
//! - [`calendar`]: nearest past and upcoming events
//!
//! [`pipeline`] runs them end to end with fetching and snapshot storage.
//!
//! [`SourceTables`]: rosterwatch_shared::SourceTables

pub mod calendar;
pub mod categories;
pub mod differ;
pub mod matcher;
pub mod normalizer;
pub mod pairing;
pub mod pipeline;
pub mod similarity;

pub use calendar::{DateWindows, EventDate, WINDOW_SIZE, select_windows};
pub use differ::{SnapshotDiff, diff_against};
pub use matcher::{SIMILARITY_CUTOFF, match_pairs};
pub use pipeline::{
    ProgressReporter, ReconcileConfig, ReconcileReport, Reconciliation, SilentProgress,
    SnapshotComparison, compare_latest_snapshots, reconcile, reconcile_tables, upcoming_events,
};
