//! Spreadsheet storage for rosterwatch.
//!
//! - [`roster`]: discovery and reading of the external contact roster
//! - [`snapshot`]: timestamped match snapshots used as the diff baseline

pub mod roster;
pub mod snapshot;

pub use roster::{discover_roster_file, read_contacts, resolve_roster_path};
pub use snapshot::{SnapshotInfo, SnapshotStore};
