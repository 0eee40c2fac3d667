//! Shared types, error model, and configuration for rosterwatch.
//!
//! This crate is the foundation depended on by all other rosterwatch crates.
//! It provides:
//! - [`RosterwatchError`]: the unified error type
//! - Domain types ([`RowBatch`], [`CategoryTable`], [`Roster`], [`Pair`], [`MatchResult`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DateOrdering, FetchConfig, ReportConfig, SchemaConfig, SourceConfig,
    StorageConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, RosterwatchError};
pub use types::{
    CandidatePair, Category, CategoryTable, ContactRow, DiffRow, MARKERS_PER_ROW, MatchResult,
    Pair, Roster, RosterEntry, RosterPair, Row, RowBatch, SchemaMismatch, SourceTables,
};
