//! Full subcommand - generate full records from a MAG dump

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use magline_core::ProgressContext;
use magline_mag::{MagError, RecordWriter, generate_full_records};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct FullArgs {
    /// MAG dump root (contains mag/ and advanced/)
    pub mag: PathBuf,

    /// Output JSON Lines file; the offset index is written next to it as <res>.index
    pub res: PathBuf,

    /// Keep fields of study scoring strictly above this value
    #[arg(long)]
    pub field_of_study_threshold: Option<f64>,

    /// Emit fields of study as (name, score) pairs
    #[arg(long)]
    pub scored_fields: bool,

    /// Skip the Journals lookup
    #[arg(long)]
    pub no_journals: bool,

    /// Emit papers without authors
    #[arg(long)]
    pub allow_empty_authors: bool,

    /// Emit papers without references
    #[arg(long)]
    pub allow_empty_references: bool,

    /// Emit papers without fields of study above the threshold
    #[arg(long)]
    pub allow_empty_fields: bool,

    /// Threads used to index the child files
    #[arg(long)]
    pub index_workers: Option<usize>,

    /// Do not share author-name strings between records
    #[arg(long)]
    pub no_intern: bool,

    /// Do not write the <res>.index sidecar
    #[arg(long)]
    pub no_index: bool,
}

fn index_path(res: &Path) -> PathBuf {
    let mut name = res.as_os_str().to_owned();
    name.push(".index");
    PathBuf::from(name)
}

pub fn run(args: FullArgs, config: &Config, progress: &ProgressContext) -> Result<ExitCode> {
    let mut join = config.join_config();
    if let Some(threshold) = args.field_of_study_threshold {
        join.field_of_study_score_threshold = threshold;
    }
    if let Some(workers) = args.index_workers {
        join.index_workers = workers.max(1);
    }
    join.scored_fields |= args.scored_fields;
    join.journals &= !args.no_journals;
    join.intern_authors &= !args.no_intern;
    join.required.authors &= !args.allow_empty_authors;
    join.required.references &= !args.allow_empty_references;
    join.required.fields &= !args.allow_empty_fields;

    let mut records = match generate_full_records(&args.mag, &join, progress) {
        Ok(records) => records,
        Err(e) if e.is_cancellation() => {
            log::warn!("Interrupted before the join started");
            return Ok(ExitCode::from(130));
        }
        Err(e) => return Err(e).context("Failed to prepare full-record join"),
    };

    let out = File::create(&args.res)
        .with_context(|| format!("Failed to create {}", args.res.display()))?;
    let index = if args.no_index {
        None
    } else {
        let path = index_path(&args.res);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Some(BufWriter::new(file))
    };
    let mut writer = RecordWriter::new(BufWriter::new(out), index)
        .with_context(|| format!("Failed to write {}", args.res.display()))?;

    let mut interrupted = false;
    for record in records.by_ref() {
        match record {
            Ok(record) => writer
                .write(&record)
                .with_context(|| format!("Failed to write {}", args.res.display()))?,
            Err(MagError::Interrupted) => {
                interrupted = true;
                break;
            }
            Err(e) => return Err(e).context("Full-record join failed"),
        }
    }

    let written = writer.written();
    let bytes = writer.bytes_written();
    writer
        .finish()
        .with_context(|| format!("Failed to flush {}", args.res.display()))?;

    let stats = records.stats();
    if progress.is_tty() {
        eprintln!("\n{}", stats.format_table());
    }

    if interrupted {
        log::warn!(
            "Interrupted: {} records written to {} are a prefix of the full output",
            magline_core::fmt_num(written),
            args.res.display()
        );
        return Ok(ExitCode::from(130));
    }

    log::info!(
        "Wrote {} records ({} bytes) to {}",
        magline_core::fmt_num(written),
        bytes,
        args.res.display()
    );
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_sits_next_to_output() {
        assert_eq!(
            index_path(Path::new("/data/full.jsonl")),
            PathBuf::from("/data/full.jsonl.index")
        );
    }
}
