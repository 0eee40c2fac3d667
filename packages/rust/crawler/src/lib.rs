//! Page retrieval and HTML table extraction for rosterwatch.
//!
//! This crate provides:
//! - [`engine`]: sequential fetcher with timeout, retry/backoff and a per-run page cache
//! - [`tables`]: extraction of `table.table` contents into [`RowBatch`]es
//!
//! [`RowBatch`]: rosterwatch_shared::RowBatch

pub mod engine;
pub mod tables;

pub use engine::Fetcher;
pub use tables::{GeneralPage, parse_general_page, parse_sub_source};
