//! Input layout of a MAG dump and sequential line reading.
//!
//! Files that are only ever scanned front to back may be gzip-compressed
//! (`Papers.txt.gz`); files that get indexed and seeked must stay plain.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::read::MultiGzDecoder;

use crate::error::MagError;
use crate::row::Row;
use crate::schema::{self, Schema};

/// Buffer size for sequential scans (256KB)
const SCAN_BUF_SIZE: usize = 256 * 1024;

/// The MAG files the join reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagFile {
    Papers,
    PaperAuthorAffiliations,
    PaperReferences,
    FieldsOfStudy,
    PaperFieldsOfStudy,
    Journals,
}

impl MagFile {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Papers => "Papers.txt",
            Self::PaperAuthorAffiliations => "PaperAuthorAffiliations.txt",
            Self::PaperReferences => "PaperReferences.txt",
            Self::FieldsOfStudy => "FieldsOfStudy.txt",
            Self::PaperFieldsOfStudy => "PaperFieldsOfStudy.txt",
            Self::Journals => "Journals.txt",
        }
    }

    /// Sub-directory of the dump root (`mag/` or `advanced/`).
    pub fn dir(self) -> &'static str {
        match self {
            Self::FieldsOfStudy | Self::PaperFieldsOfStudy => "advanced",
            _ => "mag",
        }
    }

    pub fn schema(self) -> &'static Schema {
        match self {
            Self::Papers => schema::PAPERS,
            Self::PaperAuthorAffiliations => schema::PAPER_AUTHOR_AFFILIATIONS,
            Self::PaperReferences => schema::PAPER_REFERENCES,
            Self::FieldsOfStudy => schema::FIELDS_OF_STUDY,
            Self::PaperFieldsOfStudy => schema::PAPER_FIELDS_OF_STUDY,
            Self::Journals => schema::JOURNALS,
        }
    }

    /// Indexed child files are seeked into and cannot be compressed.
    pub fn is_seekable(self) -> bool {
        matches!(self, Self::PaperAuthorAffiliations | Self::PaperReferences)
    }
}

impl std::fmt::Display for MagFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Root directory of a MAG dump (`<root>/mag`, `<root>/advanced`).
#[derive(Debug, Clone)]
pub struct MagPaths {
    root: PathBuf,
}

impl MagPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Uncompressed location of `file`.
    pub fn path(&self, file: MagFile) -> PathBuf {
        self.root.join(file.dir()).join(file.file_name())
    }

    /// Existing location of `file`, falling back to `<name>.gz` for scan-only files.
    pub fn resolve(&self, file: MagFile) -> Result<PathBuf, MagError> {
        let plain = self.path(file);
        if plain.is_file() {
            return Ok(plain);
        }
        if !file.is_seekable() {
            let gz = gz_sibling(&plain);
            if gz.is_file() {
                return Ok(gz);
            }
        }
        Err(MagError::MissingFile {
            source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
            path: plain,
        })
    }
}

fn gz_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Shared byte counter for progress tracking
pub type ByteCounter = Arc<AtomicU64>;

/// Reader wrapper that tracks bytes read
pub struct CountingReader<R> {
    inner: R,
    count: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Forward-only line reader over a plain or gzip-compressed TSV file.
///
/// `bytes_read` counts on-disk bytes, so it can drive a progress bar sized
/// by the file length in both cases.
pub struct TsvReader {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    counter: ByteCounter,
    total_bytes: u64,
    buf: Vec<u8>,
    lines: usize,
}

impl TsvReader {
    pub fn open(path: &Path) -> Result<Self, MagError> {
        let file = File::open(path).map_err(|e| MagError::open(path, e))?;
        let total_bytes = file.metadata().map_err(|e| MagError::io(path, e))?.len();
        let counter = ByteCounter::default();
        let counting = CountingReader {
            inner: file,
            count: counter.clone(),
        };
        let reader: Box<dyn BufRead + Send> = if is_gzip(path) {
            Box::new(BufReader::with_capacity(
                SCAN_BUF_SIZE,
                MultiGzDecoder::new(counting),
            ))
        } else {
            Box::new(BufReader::with_capacity(SCAN_BUF_SIZE, counting))
        };
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            counter,
            total_bytes,
            buf: Vec::with_capacity(4096),
            lines: 0,
        })
    }

    /// Next line including its terminator; invalid UTF-8 is replaced, not rejected.
    pub fn next_line(&mut self) -> Result<Option<Cow<'_, str>>, MagError> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| MagError::io(&self.path, e))?;
        if n == 0 {
            return Ok(None);
        }
        self.lines += 1;
        Ok(Some(String::from_utf8_lossy(&self.buf)))
    }

    /// Decode lines against `schema` as an iterator.
    pub fn rows(self, schema: &'static Schema) -> Rows {
        Rows {
            reader: self,
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On-disk bytes consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// On-disk file length.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn lines_read(&self) -> usize {
        self.lines
    }
}

/// Iterator of decoded rows, see [`TsvReader::rows`].
pub struct Rows {
    reader: TsvReader,
    schema: &'static Schema,
}

impl Rows {
    pub fn reader(&self) -> &TsvReader {
        &self.reader
    }
}

impl Iterator for Rows {
    type Item = Result<Row, MagError>;

    fn next(&mut self) -> Option<Self::Item> {
        let schema = self.schema;
        match self.reader.next_line() {
            Ok(Some(line)) => Some(Ok(Row::decode(&line, schema))),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn layout_matches_dump() {
        let paths = MagPaths::new("/dump");
        assert_eq!(
            paths.path(MagFile::Papers),
            PathBuf::from("/dump/mag/Papers.txt")
        );
        assert_eq!(
            paths.path(MagFile::PaperFieldsOfStudy),
            PathBuf::from("/dump/advanced/PaperFieldsOfStudy.txt")
        );
    }

    #[test]
    fn resolve_missing_is_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = MagPaths::new(dir.path())
            .resolve(MagFile::Journals)
            .unwrap_err();
        assert!(matches!(err, MagError::MissingFile { .. }));
        assert!(err.to_string().contains("Journals.txt"));
    }

    #[test]
    fn resolve_prefers_plain_then_gz() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("mag")).unwrap();
        let paths = MagPaths::new(dir.path());

        std::fs::write(dir.path().join("mag/Papers.txt.gz"), b"").unwrap();
        assert!(
            paths
                .resolve(MagFile::Papers)
                .unwrap()
                .ends_with("Papers.txt.gz")
        );

        std::fs::write(dir.path().join("mag/Papers.txt"), b"").unwrap();
        assert!(paths.resolve(MagFile::Papers).unwrap().ends_with("Papers.txt"));
    }

    #[test]
    fn seekable_files_never_fall_back_to_gz() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("mag")).unwrap();
        std::fs::write(dir.path().join("mag/PaperReferences.txt.gz"), b"").unwrap();
        let err = MagPaths::new(dir.path())
            .resolve(MagFile::PaperReferences)
            .unwrap_err();
        assert!(matches!(err, MagError::MissingFile { .. }));
    }

    #[test]
    fn reads_plain_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PaperReferences.txt");
        std::fs::write(&path, "1\t9\n2\t9").unwrap();

        let mut reader = TsvReader::open(&path).unwrap();
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("1\t9\n"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("2\t9"));
        assert!(reader.next_line().unwrap().is_none());
        assert_eq!(reader.lines_read(), 2);
        assert_eq!(reader.bytes_read(), reader.total_bytes());
    }

    #[test]
    fn reads_gzip_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PaperFieldsOfStudy.txt.gz");
        let mut gz = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        gz.write_all(b"1\t10\t0.5\n2\t11\t0.25\n").unwrap();
        gz.finish().unwrap();

        let rows: Vec<Row> = TsvReader::open(&path)
            .unwrap()
            .rows(schema::PAPER_FIELDS_OF_STUDY)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].int("FieldOfStudyId"), Some(11));
        assert_eq!(rows[1].float("Score"), Some(0.25));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"1\t\xff\n").unwrap();
        let mut reader = TsvReader::open(&path).unwrap();
        let line = reader.next_line().unwrap().unwrap().into_owned();
        assert!(line.contains('\u{FFFD}'));
    }
}
