//! Get subcommand - random access into a full-records file

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use magline_mag::{DatasetError, JsonlDataset};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Full-records JSON Lines file
    pub full: PathBuf,

    /// PaperIds to print
    #[arg(required = true)]
    pub ids: Vec<i64>,

    /// Offset index (default: <full>.index when present, else scan)
    #[arg(long)]
    pub index: Option<PathBuf>,
}

pub fn run(args: GetArgs) -> Result<ExitCode> {
    let index = args.index.clone().or_else(|| {
        let mut name = args.full.as_os_str().to_owned();
        name.push(".index");
        let path = PathBuf::from(name);
        path.exists().then_some(path)
    });

    let mut dataset = match &index {
        Some(index) => JsonlDataset::open_indexed(&args.full, index),
        None => JsonlDataset::open(&args.full),
    }
    .with_context(|| format!("Failed to open {}", args.full.display()))?;
    log::debug!("{} records available", dataset.len());

    let mut missing = 0usize;
    for id in args.ids {
        match dataset.get(id) {
            Ok(record) => println!("{}", serde_json::to_string(&record)?),
            Err(DatasetError::NotFound(id)) => {
                log::warn!("PaperId {id} not found");
                missing += 1;
            }
            Err(e) => return Err(e).context("Failed to read record"),
        }
    }

    Ok(if missing == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
