//! End-to-end reconciliation run: roster file → scrape → normalize → pair →
//! match → diff → snapshot.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tracing::{info, instrument, warn};

use rosterwatch_crawler::Fetcher;
use rosterwatch_shared::{
    AppConfig, CategoryTable, ContactRow, DateOrdering, FetchConfig, MatchResult, Result,
    SchemaConfig, SchemaMismatch, SourceTables,
};
use rosterwatch_storage::{SnapshotInfo, SnapshotStore, read_contacts, resolve_roster_path};

use crate::calendar::{DateWindows, select_windows};
use crate::categories::build_category_table;
use crate::differ::{SnapshotDiff, diff_against};
use crate::matcher::match_pairs;
use crate::normalizer::normalize_roster;
use crate::pairing::{pair_candidates, pair_roster};

/// Configuration for one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub fetch: FetchConfig,
    pub schema: SchemaConfig,
    /// Explicit roster file; discovered in `search_dir` when absent.
    pub roster_path: Option<PathBuf>,
    pub search_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    /// Write a snapshot after a successful run.
    pub persist: bool,
    pub date_ordering: DateOrdering,
    /// Reference day for the date windows.
    pub today: NaiveDate,
}

impl From<&AppConfig> for ReconcileConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            fetch: FetchConfig::from(cfg),
            schema: cfg.schema.clone(),
            roster_path: cfg.storage.roster_path.as_ref().map(PathBuf::from),
            search_dir: PathBuf::from("."),
            snapshot_dir: PathBuf::from(&cfg.storage.snapshot_dir),
            persist: cfg.storage.persist,
            date_ordering: cfg.report.date_ordering,
            today: Local::now().date_naive(),
        }
    }
}

/// Output of the pure reconciliation stages.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub categories: CategoryTable,
    pub windows: DateWindows,
    pub roster_entries: usize,
    pub roster_pairs: usize,
    pub candidates: usize,
    pub diff: SnapshotDiff,
    /// Every schema diagnostic raised while building the tables.
    pub schema_mismatches: Vec<SchemaMismatch>,
}

impl Reconciliation {
    pub fn matches(&self) -> impl Iterator<Item = &MatchResult> {
        self.diff.rows.iter().map(|r| &r.result)
    }
}

/// Result of a full [`reconcile`] run.
#[derive(Debug)]
pub struct ReconcileReport {
    pub reconciliation: Reconciliation,
    pub roster_file: PathBuf,
    /// Snapshot the run was compared against.
    pub baseline: Option<SnapshotInfo>,
    /// Snapshot written by this run.
    pub saved: Option<SnapshotInfo>,
    pub requests: usize,
    pub elapsed: Duration,
}

/// Two stored snapshots compared offline.
#[derive(Debug)]
pub struct SnapshotComparison {
    pub current: SnapshotInfo,
    pub previous: Option<SnapshotInfo>,
    pub diff: SnapshotDiff,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, report: &ReconcileReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &ReconcileReport) {}
}

// ---------------------------------------------------------------------------
// Pure stages
// ---------------------------------------------------------------------------

/// Run every in-memory stage over already fetched tables.
pub fn reconcile_tables(
    tables: &SourceTables,
    contacts: &[ContactRow],
    baseline: &[MatchResult],
    schema: &SchemaConfig,
    today: NaiveDate,
    ordering: DateOrdering,
) -> Result<Reconciliation> {
    let categories = build_category_table(&tables.general, schema)?;
    let roster = normalize_roster(&tables.sub_sources, &categories)?;

    let roster_pairs = pair_roster(&roster, &schema.participants_column)?;
    let candidates = pair_candidates(contacts)?;
    let matches = match_pairs(&roster_pairs, &candidates);
    let diff = diff_against(&matches, baseline);

    let windows = select_windows(today, &categories.categories, ordering);

    let schema_mismatches = categories
        .schema_mismatch
        .iter()
        .chain(&roster.schema_mismatches)
        .cloned()
        .collect();

    Ok(Reconciliation {
        roster_entries: roster.len(),
        roster_pairs: roster_pairs.len(),
        candidates: candidates.len(),
        categories,
        windows,
        diff,
        schema_mismatches,
    })
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Run the full reconciliation.
///
/// 1. Read the contact roster file
/// 2. Fetch the general page and every sub-source
/// 3. Normalize, pair, match
/// 4. Diff against the latest snapshot
/// 5. Save a new snapshot (when persisting)
#[instrument(skip_all, fields(url = %config.fetch.url))]
pub async fn reconcile(
    config: &ReconcileConfig,
    progress: &dyn ProgressReporter,
) -> Result<ReconcileReport> {
    let start = Instant::now();

    // --- Phase 1: Roster file ---
    progress.phase("Reading roster file");
    let roster_file = resolve_roster_path(config.roster_path.as_deref(), &config.search_dir)?;
    let contacts = read_contacts(
        &roster_file,
        &config.schema.pair_column,
        config.schema.contact_column.as_deref(),
    )?;

    // --- Phase 2: Scrape ---
    progress.phase("Fetching registration lists");
    let url = config.fetch.source_url()?;
    let fetcher = Fetcher::new(config.fetch.clone())?;
    let tables = fetcher.fetch_all(&url).await?;

    // --- Phase 3: Baseline ---
    progress.phase("Loading previous snapshot");
    let store = SnapshotStore::new(&config.snapshot_dir);
    let baseline = store.latest()?;
    let previous = match &baseline {
        Some(info) => store.load(info)?,
        None => {
            info!(dir = %store.dir().display(), "no previous snapshot, every match is new");
            Vec::new()
        }
    };

    // --- Phase 4: Reconcile ---
    progress.phase("Matching pairs");
    let reconciliation = reconcile_tables(
        &tables,
        &contacts,
        &previous,
        &config.schema,
        config.today,
        config.date_ordering,
    )?;
    for mismatch in &reconciliation.schema_mismatches {
        warn!(%mismatch, "schema mismatch, positional columns used");
    }

    // --- Phase 5: Snapshot ---
    let saved = if config.persist {
        progress.phase("Saving snapshot");
        Some(store.save(&reconciliation.diff.rows)?)
    } else {
        None
    };

    let report = ReconcileReport {
        reconciliation,
        roster_file,
        baseline,
        saved,
        requests: fetcher.requests_made(),
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        matched = report.reconciliation.diff.rows.len(),
        new = report.reconciliation.diff.new_count(),
        requests = report.requests,
        elapsed_ms = report.elapsed.as_millis(),
        "reconciliation complete"
    );

    Ok(report)
}

/// Fetch only the general page and select the date windows.
#[instrument(skip_all, fields(url = %config.fetch.url))]
pub async fn upcoming_events(config: &ReconcileConfig) -> Result<(CategoryTable, DateWindows)> {
    let url = config.fetch.source_url()?;
    let fetcher = Fetcher::new(config.fetch.clone())?;
    let general = fetcher.fetch_general(&url).await?;

    let categories = build_category_table(&general.table, &config.schema)?;
    let windows = select_windows(config.today, &categories.categories, config.date_ordering);
    Ok((categories, windows))
}

/// Compare the most recent stored snapshot with the one before it.
///
/// Returns `None` when the store holds no snapshots.
pub fn compare_latest_snapshots(store: &SnapshotStore) -> Result<Option<SnapshotComparison>> {
    let Some(current) = store.latest()? else {
        return Ok(None);
    };
    let previous = store.previous()?;

    let current_rows = store.load(&current)?;
    let previous_rows = match &previous {
        Some(info) => store.load(info)?,
        None => Vec::new(),
    };

    Ok(Some(SnapshotComparison {
        diff: diff_against(&current_rows, &previous_rows),
        current,
        previous,
    }))
}
