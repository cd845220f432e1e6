//! Logging setup with indicatif integration

use indicatif::MultiProgress;

/// How chatty the process should be when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Phase boundaries and summaries
    Normal,
    /// Per-file details and skipped rows
    Debug,
}

impl Verbosity {
    /// Pick the default level for a run.
    ///
    /// On a TTY progress bars already show activity, so info logs are
    /// suppressed unless `--debug` is given.
    pub fn for_terminal(is_tty: bool, debug: bool) -> Self {
        match (debug, is_tty) {
            (true, _) => Self::Debug,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    fn filter(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
        }
    }
}

/// Padded label for a log level, optionally wrapped in ANSI color codes.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Logger that prints through `MultiProgress::suspend` so lines never tear a bar.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        let (pre, label, post) = level_style(record.level(), true);
        let line = if record.level() >= log::Level::Debug {
            format!("[{pre}{label}{post}] {}: {}", record.target(), record.args())
        } else {
            format!("[{pre}{label}{post}] {}", record.args())
        };
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger.
///
/// With `multi` set (TTY mode) records go through the progress bars; otherwise
/// plain timestamped lines are written to stderr for log collectors.
/// Calling this twice is a no-op for the second call.
pub fn init_logging(verbosity: Verbosity, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(verbosity.filter());

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env).build();
        let max_level = logger.filter();
        if log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone()))).is_ok() {
            log::set_max_level(max_level);
        }
    } else {
        let _ = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                let (_, label, _) = level_style(record.level(), false);
                writeln!(
                    buf,
                    "{} [{label}] {}",
                    buf.timestamp_millis(),
                    record.args()
                )
            })
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_debug_wins() {
        assert_eq!(Verbosity::for_terminal(true, true), Verbosity::Debug);
        assert_eq!(Verbosity::for_terminal(false, true), Verbosity::Debug);
    }

    #[test]
    fn verbosity_tty_is_quiet() {
        assert_eq!(Verbosity::for_terminal(true, false), Verbosity::Quiet);
        assert_eq!(Verbosity::for_terminal(false, false), Verbosity::Normal);
    }

    #[test]
    fn plain_labels_have_no_ansi() {
        let (pre, label, post) = level_style(log::Level::Warn, false);
        assert_eq!(pre, "");
        assert_eq!(label, "WARN ");
        assert_eq!(post, "");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_logging(Verbosity::Quiet, None);
        init_logging(Verbosity::Debug, None);
    }
}
