//! Random access to a full-record JSONL file by paper id.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::record::FullRecord;

/// Header of the `.index` sidecar written next to a JSONL output.
pub const INDEX_HEADER: &str = "key\tfile_line_offset";

#[derive(Debug)]
pub enum DatasetError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    /// A line that is not a valid record.
    Parse {
        path: PathBuf,
        offset: u64,
        message: String,
    },
    /// Malformed `.index` sidecar (1-based line).
    BadIndex { path: PathBuf, line: usize },
    NotFound(i64),
}

impl DatasetError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "IO error on {}: {source}", path.display()),
            Self::Parse {
                path,
                offset,
                message,
            } => write!(
                f,
                "{}: invalid record at byte {offset}: {message}",
                path.display()
            ),
            Self::BadIndex { path, line } => {
                write!(f, "{}: malformed index line {line}", path.display())
            }
            Self::NotFound(id) => write!(f, "paper {id} not found"),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn parse<'de, T: Deserialize<'de>>(path: &Path, offset: u64, line: &'de [u8]) -> Result<T, DatasetError> {
    let text = std::str::from_utf8(line).map_err(|e| DatasetError::Parse {
        path: path.to_path_buf(),
        offset,
        message: e.to_string(),
    })?;
    sonic_rs::from_str(text).map_err(|e| DatasetError::Parse {
        path: path.to_path_buf(),
        offset,
        message: e.to_string(),
    })
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Sequential reader of `(line offset, record)` pairs; blank lines are skipped.
pub struct JsonlRecords {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    offset: u64,
}

impl JsonlRecords {
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(256 * 1024, file),
            buf: Vec::with_capacity(4096),
            offset: 0,
        })
    }

    /// Next non-blank raw line with its offset.
    fn next_line(&mut self) -> Result<Option<u64>, DatasetError> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|e| DatasetError::io(&self.path, e))?;
            if n == 0 {
                return Ok(None);
            }
            let offset = self.offset;
            self.offset += n as u64;
            if !is_blank(&self.buf) {
                return Ok(Some(offset));
            }
        }
    }
}

impl Iterator for JsonlRecords {
    type Item = Result<(u64, FullRecord), DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Ok(Some(offset)) => Some(parse(&self.path, offset, &self.buf).map(|r| (offset, r))),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[derive(Deserialize)]
struct PaperIdOnly {
    #[serde(rename = "PaperId")]
    paper_id: i64,
}

/// Full-record JSONL file with an in-memory `PaperId -> offset` map.
///
/// A paper id that occurs twice resolves to its last line.
pub struct JsonlDataset {
    path: PathBuf,
    file: BufReader<File>,
    offsets: FxHashMap<i64, u64>,
    buf: Vec<u8>,
}

impl JsonlDataset {
    /// Scan `path` once to build the offset map.
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let mut lines = JsonlRecords::open(path)?;
        let mut offsets = FxHashMap::default();
        while let Some(offset) = lines.next_line()? {
            let id: PaperIdOnly = parse(path, offset, &lines.buf)?;
            offsets.insert(id.paper_id, offset);
        }
        log::debug!("Indexed {} records of {}", offsets.len(), path.display());
        Self::with_offsets(path, offsets)
    }

    /// Load the offset map from the `.index` sidecar instead of scanning.
    pub fn open_indexed(path: &Path, index_path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(index_path).map_err(|e| DatasetError::io(index_path, e))?;
        let mut lines = BufReader::new(file).lines();
        let bad = |line| DatasetError::BadIndex {
            path: index_path.to_path_buf(),
            line,
        };

        match lines.next() {
            Some(Ok(header)) if header.trim_end() == INDEX_HEADER => {}
            Some(Err(e)) => return Err(DatasetError::io(index_path, e)),
            _ => return Err(bad(1)),
        }
        let mut offsets = FxHashMap::default();
        for (i, line) in lines.enumerate() {
            let line = line.map_err(|e| DatasetError::io(index_path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, offset) = line.trim_end().split_once('\t').ok_or_else(|| bad(i + 2))?;
            let key: i64 = key.parse().map_err(|_| bad(i + 2))?;
            let offset: u64 = offset.parse().map_err(|_| bad(i + 2))?;
            offsets.insert(key, offset);
        }
        Self::with_offsets(path, offsets)
    }

    fn with_offsets(path: &Path, offsets: FxHashMap<i64, u64>) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            offsets,
            buf: Vec::new(),
        })
    }

    /// Number of distinct paper ids.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn contains(&self, paper_id: i64) -> bool {
        self.offsets.contains_key(&paper_id)
    }

    pub fn get(&mut self, paper_id: i64) -> Result<FullRecord, DatasetError> {
        let offset = *self
            .offsets
            .get(&paper_id)
            .ok_or(DatasetError::NotFound(paper_id))?;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DatasetError::io(&self.path, e))?;
        self.buf.clear();
        self.file
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| DatasetError::io(&self.path, e))?;
        parse(&self.path, offset, &self.buf)
    }
}
