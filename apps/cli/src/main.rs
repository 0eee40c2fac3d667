//! rosterwatch CLI: reconcile competition registration lists against a contact roster.
//!
//! Scrapes the registration pages, matches registered pairs against the
//! roster file, and reports which matches are new since the last snapshot.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
