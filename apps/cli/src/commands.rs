//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use rosterwatch_core::{
    DateWindows, ProgressReporter, ReconcileConfig, ReconcileReport, SnapshotDiff,
    compare_latest_snapshots, reconcile, upcoming_events,
};
use rosterwatch_shared::{
    AppConfig, Category, DateOrdering, MatchResult, init_config, load_config, load_config_from,
};
use rosterwatch_storage::SnapshotStore;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rosterwatch: who from the contact roster registered, and who is new.
#[derive(Parser)]
#[command(
    name = "rosterwatch",
    version,
    about = "Reconcile competition registration lists against a contact roster.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.rosterwatch/rosterwatch.toml.
    #[arg(long, global = true, env = "ROSTERWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Options shared by commands that read the registration source.
#[derive(clap::Args)]
pub(crate) struct SourceArgs {
    /// Registration list URL (overrides the config file).
    #[arg(long)]
    pub url: Option<String>,

    /// Compare event dates as raw `DD.MM` strings instead of calendar dates.
    #[arg(long)]
    pub lexicographic_dates: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape, match against the roster file and diff against the last snapshot.
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Roster file (defaults to the first .xlsx in the working directory).
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Snapshot directory.
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Do not write a snapshot for this run.
        #[arg(long)]
        no_save: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the nearest past and upcoming events.
    Events {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Compare the two most recent snapshots without fetching anything.
    Diff {
        /// Snapshot directory.
        #[arg(long)]
        snapshots: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rosterwatch=info",
        1 => "rosterwatch=debug",
        _ => "rosterwatch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run {
            source,
            roster,
            snapshots,
            no_save,
            json,
        } => {
            let mut run_config = reconcile_config(&config, &source);
            if roster.is_some() {
                run_config.roster_path = roster;
            }
            if let Some(dir) = snapshots {
                run_config.snapshot_dir = dir;
            }
            if no_save {
                run_config.persist = false;
            }
            cmd_run(&run_config, json).await
        }
        Command::Events { source } => cmd_events(&reconcile_config(&config, &source)).await,
        Command::Diff { snapshots } => {
            let dir = snapshots.unwrap_or_else(|| PathBuf::from(&config.storage.snapshot_dir));
            cmd_diff(&SnapshotStore::new(dir))
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Runtime config from the config file, with source flags applied.
fn reconcile_config(config: &AppConfig, source: &SourceArgs) -> ReconcileConfig {
    let mut run_config = ReconcileConfig::from(config);
    if let Some(url) = &source.url {
        run_config.fetch.url = url.clone();
    }
    if source.lexicographic_dates {
        run_config.date_ordering = DateOrdering::Lexicographic;
    }
    run_config
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &ReconcileConfig, json: bool) -> Result<()> {
    info!(
        url = %config.fetch.url,
        snapshots = %config.snapshot_dir.display(),
        persist = config.persist,
        "starting reconciliation"
    );

    let reporter = CliProgress::new();
    let report = match reconcile(config, &reporter).await {
        Ok(report) => report,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&JsonReport::from(&report))?);
        return Ok(());
    }

    let rec = &report.reconciliation;
    print_windows(&rec.windows);

    println!("  Roster file:  {}", report.roster_file.display());
    println!(
        "  Registered:   {} entries, {} pairs",
        rec.roster_entries, rec.roster_pairs
    );
    println!("  Candidates:   {}", rec.candidates);
    for mismatch in &rec.schema_mismatches {
        println!("  Warning:      {mismatch}");
    }
    println!();

    print_diff(&rec.diff);

    match &report.baseline {
        Some(info) => println!("  Compared with: {}", info.path.display()),
        None => println!("  No previous snapshot, every match is new."),
    }
    if let Some(info) = &report.saved {
        println!("  Saved:         {}", info.path.display());
    }
    println!(
        "  Time:          {:.1}s ({} requests)",
        report.elapsed.as_secs_f64(),
        report.requests
    );
    println!();

    Ok(())
}

async fn cmd_events(config: &ReconcileConfig) -> Result<()> {
    let (categories, windows) = upcoming_events(config).await?;
    if let Some(mismatch) = &categories.schema_mismatch {
        println!("  Warning: {mismatch}");
    }
    print_windows(&windows);
    Ok(())
}

fn cmd_diff(store: &SnapshotStore) -> Result<()> {
    let Some(comparison) = compare_latest_snapshots(store)? else {
        return Err(eyre!("no snapshots found in '{}'", store.dir().display()));
    };

    println!();
    println!("  Current:  {}", comparison.current.path.display());
    match &comparison.previous {
        Some(info) => println!("  Previous: {}", info.path.display()),
        None => println!("  Previous: none"),
    }
    println!();
    print_diff(&comparison.diff);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Console report
// ---------------------------------------------------------------------------

fn print_windows(windows: &DateWindows) {
    println!();
    println!("  Today: {}", windows.today);
    println!();

    if windows.past.is_empty() {
        println!("  There are no past competitions.");
    } else {
        println!("  The nearest past competitions:");
        print_events(&windows.past);
    }
    println!();

    if windows.future.is_empty() {
        println!("  There are no upcoming competitions.");
    } else {
        println!("  The nearest upcoming competitions:");
        print_events(&windows.future);
    }
    println!();
}

fn print_events(events: &[Category]) {
    for event in events {
        println!("    - {:<12} {}", event.date, event.name);
    }
}

fn print_diff(diff: &SnapshotDiff) {
    if diff.rows.is_empty() {
        println!("  No registered pairs matched the roster.");
        println!();
        return;
    }

    println!(
        "  Matches: {} ({} new, {} recurring)",
        diff.rows.len(),
        diff.new_count(),
        diff.recurring
    );
    for row in &diff.rows {
        let marker = if row.recurring { " " } else { "+" };
        let result = &row.result;
        let contact = result.contact.as_deref().unwrap_or("");
        println!(
            "  {marker} {:<32} {:<24} {:.2}  {contact}",
            result.pair, result.category, result.score
        );
    }
    println!();
}

#[derive(Serialize)]
struct JsonRow<'a> {
    #[serde(flatten)]
    result: &'a MatchResult,
    status: &'static str,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    today: &'a str,
    past: &'a [Category],
    future: &'a [Category],
    matches: Vec<JsonRow<'a>>,
    new: usize,
    recurring: usize,
    baseline: Option<String>,
    saved: Option<String>,
}

impl<'a> From<&'a ReconcileReport> for JsonReport<'a> {
    fn from(report: &'a ReconcileReport) -> Self {
        let rec = &report.reconciliation;
        Self {
            today: &rec.windows.today,
            past: &rec.windows.past,
            future: &rec.windows.future,
            matches: rec
                .diff
                .rows
                .iter()
                .map(|row| JsonRow {
                    result: &row.result,
                    status: if row.recurring { "recurring" } else { "new" },
                })
                .collect(),
            new: rec.diff.new_count(),
            recurring: rec.diff.recurring,
            baseline: report.baseline.as_ref().map(|i| i.path.display().to_string()),
            saved: report.saved.as_ref().map(|i| i.path.display().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _report: &ReconcileReport) {
        self.spinner.finish_and_clear();
    }
}
