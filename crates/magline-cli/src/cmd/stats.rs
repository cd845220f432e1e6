//! Stats subcommand - summarize a full-records file

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use magline_mag::stats::{record_stats, title_filter};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Full-records JSON Lines file
    pub full: PathBuf,

    /// Count only titles matching this regex at their start
    #[arg(long)]
    pub title_filter: Option<String>,
}

pub fn run(args: StatsArgs) -> Result<ExitCode> {
    let filter = args
        .title_filter
        .as_deref()
        .map(title_filter)
        .transpose()
        .context("Invalid --title-filter")?;

    let stats = record_stats(&args.full, filter.as_ref())
        .with_context(|| format!("Failed to read {}", args.full.display()))?;
    println!("{}", stats.format_report());
    Ok(ExitCode::SUCCESS)
}
