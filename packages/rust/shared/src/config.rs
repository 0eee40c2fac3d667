//! Application configuration for rosterwatch.
//!
//! User config lives at `~/.rosterwatch/rosterwatch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, RosterwatchError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rosterwatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rosterwatch";

/// Default registration list.
const DEFAULT_SOURCE_URL: &str =
    "https://dance.vftsarr.ru/reg_module/?mode=reglists&competition_id=97";

// ---------------------------------------------------------------------------
// Config structs (matching rosterwatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote source and fetch policy.
    #[serde(default)]
    pub source: SourceConfig,

    /// Column names expected in scraped tables and the roster file.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Roster file and snapshot locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Console report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page holding the general-information table.
    #[serde(default = "default_source_url")]
    pub url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Initial backoff between retries; doubles on each attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Pause between consecutive page requests.
    #[serde(default)]
    pub rate_limit_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
            rate_limit_ms: 0,
        }
    }
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_retries() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}

/// `[schema]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Roster column holding the participant names.
    #[serde(default = "default_participants_column")]
    pub participants_column: String,

    /// General-table column holding the category name.
    #[serde(default = "default_category_column")]
    pub category_column: String,

    /// General-table column holding the event date.
    #[serde(default = "default_date_column")]
    pub date_column: String,

    /// Roster-file column holding the pair strings.
    #[serde(default = "default_pair_column")]
    pub pair_column: String,

    /// Optional roster-file column with contact details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_column: Option<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            participants_column: default_participants_column(),
            category_column: default_category_column(),
            date_column: default_date_column(),
            pair_column: default_pair_column(),
            contact_column: None,
        }
    }
}

fn default_participants_column() -> String {
    "Участники".into()
}
fn default_category_column() -> String {
    "Категория".into()
}
fn default_date_column() -> String {
    "Дата".into()
}
fn default_pair_column() -> String {
    "Пара".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Explicit roster file; when unset the first `*.xlsx` in the working directory is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster_path: Option<String>,

    /// Directory holding timestamped match snapshots.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Whether `run` writes a new snapshot.
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            roster_path: None,
            snapshot_dir: default_snapshot_dir(),
            persist: true,
        }
    }
}

fn default_snapshot_dir() -> String {
    "snapshots".into()
}
fn default_true() -> bool {
    true
}

/// How event dates are ordered against today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrdering {
    /// Parse dates and compare them on the calendar.
    #[default]
    Calendar,
    /// Compare raw strings against today formatted as `DD.MM`.
    Lexicographic,
}

/// `[report]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub date_ordering: DateOrdering,
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Page holding the general-information table.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first failed attempt.
    pub retries: u32,
    /// Initial retry backoff in ms.
    pub backoff_ms: u64,
    /// Pause between consecutive requests in ms.
    pub rate_limit_ms: u64,
}

impl FetchConfig {
    /// Parse the configured source URL.
    pub fn source_url(&self) -> Result<Url> {
        Url::parse(&self.url)
            .map_err(|e| RosterwatchError::config(format!("invalid source url '{}': {e}", self.url)))
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            url: config.source.url.clone(),
            timeout_secs: config.source.timeout_secs,
            retries: config.source.retries,
            backoff_ms: config.source.backoff_ms,
            rate_limit_ms: config.source.rate_limit_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rosterwatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RosterwatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rosterwatch/rosterwatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RosterwatchError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RosterwatchError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RosterwatchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RosterwatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RosterwatchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("snapshot_dir"));
        assert!(toml_str.contains("Участники"));
        assert!(toml_str.contains("calendar"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.source.retries, 3);
        assert_eq!(parsed.schema.pair_column, "Пара");
        assert!(parsed.storage.persist);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[source]
url = "https://example.com/reglists"
retries = 5

[schema]
contact_column = "Телефон"

[report]
date_ordering = "lexicographic"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.retries, 5);
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.schema.contact_column.as_deref(), Some("Телефон"));
        assert_eq!(config.schema.category_column, "Категория");
        assert_eq!(config.report.date_ordering, DateOrdering::Lexicographic);
    }

    #[test]
    fn fetch_config_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.timeout_secs, 30);
        assert_eq!(fetch.backoff_ms, 500);
        assert!(fetch.source_url().is_ok());
    }

    #[test]
    fn invalid_source_url_is_config_error() {
        let mut app = AppConfig::default();
        app.source.url = "not a url".into();
        let err = FetchConfig::from(&app).source_url().unwrap_err();
        assert!(matches!(err, RosterwatchError::Config { .. }));
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/rosterwatch.toml")).unwrap_err();
        assert!(matches!(err, RosterwatchError::Io { .. }));
    }
}
