//! Error type for MAG scans and joins

use std::path::{Path, PathBuf};

/// Fatal failure of an index build, dictionary scan, or join pass.
///
/// Row-level problems never show up here: they decode to nulls. Missing child
/// groups are empty results, not errors.
#[derive(Debug)]
pub enum MagError {
    /// A required input file does not exist or cannot be opened.
    MissingFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The join-key column decreases at `offset`.
    SortViolation {
        path: PathBuf,
        offset: u64,
        previous: String,
        key: String,
    },
    /// A non-blank line whose join key does not parse.
    InvalidKey { path: PathBuf, offset: u64 },
    /// Read failure after the file was opened.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// An index scan stopped because a sibling scan failed or shutdown was requested.
    Cancelled { path: PathBuf },
    /// The join pass observed a shutdown request.
    Interrupted,
}

impl MagError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Open failures with `NotFound`/`PermissionDenied` are reported as missing files.
    pub(crate) fn open(path: &Path, source: std::io::Error) -> Self {
        Self::MissingFile {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error was caused by cancellation rather than bad input.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::Interrupted)
    }
}

impl std::fmt::Display for MagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFile { path, source } => {
                write!(f, "missing input file {}: {source}", path.display())
            }
            Self::SortViolation {
                path,
                offset,
                previous,
                key,
            } => write!(
                f,
                "{} is not sorted by its first column: key {key} after {previous} at byte {offset}",
                path.display()
            ),
            Self::InvalidKey { path, offset } => {
                write!(f, "{}: unparsable join key at byte {offset}", path.display())
            }
            Self::Io { path, source } => write!(f, "IO error reading {}: {source}", path.display()),
            Self::Cancelled { path } => write!(f, "scan of {} cancelled", path.display()),
            Self::Interrupted => f.write_str("interrupted by shutdown request"),
        }
    }
}

impl std::error::Error for MagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MissingFile { source, .. } | Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::ErrorKind;

    #[test]
    fn sort_violation_names_file() {
        let err = MagError::SortViolation {
            path: PathBuf::from("/data/mag/PaperReferences.txt"),
            offset: 42,
            previous: "3".to_string(),
            key: "2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PaperReferences.txt"));
        assert!(msg.contains("key 2 after 3"));
        assert!(msg.contains("byte 42"));
    }

    #[test]
    fn missing_file_has_source() {
        let err = MagError::open(
            Path::new("Papers.txt"),
            std::io::Error::new(ErrorKind::NotFound, "no such file"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("missing input file Papers.txt"));
    }

    #[test]
    fn cancellation_kinds() {
        assert!(MagError::Interrupted.is_cancellation());
        assert!(
            MagError::Cancelled {
                path: PathBuf::from("a")
            }
            .is_cancellation()
        );
        assert!(
            !MagError::InvalidKey {
                path: PathBuf::from("a"),
                offset: 0
            }
            .is_cancellation()
        );
    }
}
