//! Error types for rosterwatch.
//!
//! Library crates use [`RosterwatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all rosterwatch operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterwatchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A sub-source (or the general page) could not be fetched.
    #[error("source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    /// HTML parsing or table extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// No external roster file could be found.
    #[error("roster file not found: {path:?}")]
    RosterFileMissing { path: PathBuf },

    /// A name-token stream had an odd number of tokens.
    #[error("odd token count in {context}: {tokens} tokens, dangling token {dangling:?}")]
    TokenParityViolation {
        context: String,
        tokens: usize,
        dangling: String,
    },

    /// A sub-source reported a data-marker count that is not a whole number of rows.
    #[error("invalid marker count in {source_label}: {markers} is not a multiple of {per_row}")]
    InvalidMarkerCount {
        source_label: String,
        markers: usize,
        per_row: usize,
    },

    /// Back-filled category rows do not cover the physical roster rows.
    #[error("category back-fill covers {assigned} rows but the roster has {rows}")]
    BackfillMismatch { assigned: usize, rows: usize },

    /// Spreadsheet read/write error.
    #[error("spreadsheet error at {path:?}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RosterwatchError>;

impl RosterwatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a source-unavailable error for `url`.
    pub fn source_unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a spreadsheet library error with the file it concerns.
    pub fn spreadsheet(path: impl Into<PathBuf>, msg: impl std::fmt::Display) -> Self {
        Self::Spreadsheet {
            path: path.into(),
            message: msg.to_string(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
