//! magline - Full-record generation for the Microsoft Academic Graph dump
//!
//! Joins Papers with their authors, references, and fields of study into
//! one JSON line per paper, and inspects the resulting dataset.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "magline")]
#[command(about = "Sorted-file join over the Microsoft Academic Graph dump")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./magline.toml or ~/.config/magline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate full records (JSON lines plus offset index)
    Full(cmd::full::FullArgs),
    /// Summarize a full-records file
    Stats(cmd::stats::StatsArgs),
    /// Score distribution of PaperFieldsOfStudy
    FieldsOfStudyScoreStats(cmd::fos_stats::FosStatsArgs),
    /// Look up records by PaperId
    Get(cmd::get::GetArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let progress = magline_core::ProgressContext::new();

    // Logging:
    //   TTY:     warn unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    magline_core::init_logging(
        magline_core::Verbosity::for_terminal(is_tty, cli.debug),
        multi,
    );

    if let Err(e) = magline_core::install_signal_handlers() {
        log::warn!("Failed to install signal handlers: {e}");
    }

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Full(args) => cmd::full::run(args, &config, &progress),
        Command::Stats(args) => cmd::stats::run(args),
        Command::FieldsOfStudyScoreStats(args) => cmd::fos_stats::run(args),
        Command::Get(args) => cmd::get::run(args),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let join = config.join_config();
            let yes_no = |b: bool| if b { "yes" } else { "no" };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Field-of-study threshold",
                &format!("> {}", join.field_of_study_score_threshold),
            ]);
            table.add_row(vec!["Scored fields", yes_no(join.scored_fields)]);
            table.add_row(vec!["Journals", yes_no(join.journals)]);
            table.add_row(vec!["Require authors", yes_no(join.required.authors)]);
            table.add_row(vec![
                "Require references",
                yes_no(join.required.references),
            ]);
            table.add_row(vec!["Require fields", yes_no(join.required.fields)]);
            table.add_row(vec![
                "Author interning",
                &if join.intern_authors {
                    format!("up to {}", magline_core::fmt_num(join.intern_capacity))
                } else {
                    "off".to_string()
                },
            ]);
            table.add_row(vec!["Index workers", &join.index_workers.to_string()]);

            eprintln!("\n{table}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
