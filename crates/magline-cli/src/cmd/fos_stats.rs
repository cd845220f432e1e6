//! Score distribution of PaperFieldsOfStudy

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Args;
use magline_mag::stats::score_stats;

#[derive(Args, Debug)]
pub struct FosStatsArgs {
    /// PaperFieldsOfStudy file (plain or .gz)
    pub file: PathBuf,
}

pub fn run(args: FosStatsArgs) -> Result<ExitCode> {
    let Some(stats) = score_stats(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?
    else {
        bail!("No scores found in {}", args.file.display());
    };
    println!("{}", stats.format_report());
    Ok(ExitCode::SUCCESS)
}
