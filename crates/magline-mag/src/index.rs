//! Sorted-sequence indexer.
//!
//! One scan over a file sorted by its first column records, for every distinct
//! key, the byte offset of the first line carrying it. The scan also checks the
//! sort order: a key smaller than its predecessor aborts the build.

use std::fmt::Display;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indicatif::ProgressBar;
use magline_core::{fmt_num, is_shutdown_requested};
use memmap2::Mmap;

use crate::error::MagError;
use crate::locate::locate;

/// Lines between cancellation polls and progress updates
const POLL_INTERVAL: usize = 64 * 1024;

/// Distinct keys of a sorted file with the offset of each key's first line.
///
/// `keys` is strictly increasing and `offsets[i]` belongs to `keys[i]`, so the
/// offsets are strictly increasing too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedIndex<K = i64> {
    keys: Vec<K>,
    offsets: Vec<u64>,
}

impl<K: Ord> SortedIndex<K> {
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Byte offset of the first line with `key`.
    pub fn offset_of(&self, key: &K) -> Option<u64> {
        locate(&self.keys, key).map(|i| self.offsets[i])
    }

    pub fn into_parts(self) -> (Vec<K>, Vec<u64>) {
        (self.keys, self.offsets)
    }
}

/// Join key of a MAG line: the first tab-separated cell as an integer.
///
/// Surrounding whitespace and the line terminator are ignored.
pub fn paper_id_key(line: &[u8]) -> Option<i64> {
    let cell = line.split(|&b| b == b'\t').next()?;
    std::str::from_utf8(cell).ok()?.trim().parse().ok()
}

pub(crate) fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Index `path` by its integer first column.
///
/// Never cancelled and draws no progress; see [`build_index_with`].
pub fn build_index(path: &Path) -> Result<SortedIndex<i64>, MagError> {
    build_index_with(path, paper_id_key, &AtomicBool::new(false), &ProgressBar::hidden())
}

/// Index `path` using `extract` to read each line's key.
///
/// Blank lines are skipped. A non-blank line without a key fails with
/// [`MagError::InvalidKey`]; a decreasing key fails with
/// [`MagError::SortViolation`]. `cancel` and the global shutdown flag are
/// polled every few thousand lines.
pub fn build_index_with<K, F>(
    path: &Path,
    extract: F,
    cancel: &AtomicBool,
    pb: &ProgressBar,
) -> Result<SortedIndex<K>, MagError>
where
    K: Ord + Copy + Display,
    F: Fn(&[u8]) -> Option<K>,
{
    let start = Instant::now();
    let file = File::open(path).map_err(|e| MagError::open(path, e))?;
    let len = file.metadata().map_err(|e| MagError::io(path, e))?.len();
    if len == 0 {
        log::debug!("{} is empty", path.display());
        return Ok(SortedIndex {
            keys: Vec::new(),
            offsets: Vec::new(),
        });
    }

    // SAFETY: inputs are read-only dumps, nothing truncates them while we scan
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| MagError::io(path, e))?;
    #[cfg(unix)]
    if let Err(e) = mmap.advise(memmap2::Advice::Sequential) {
        log::debug!("madvise failed for {}: {e}", path.display());
    }
    let data: &[u8] = &mmap;

    let mut keys = Vec::new();
    let mut offsets = Vec::new();
    let mut previous: Option<K> = None;
    let mut pos = 0usize;
    let mut lines = 0usize;

    while pos < data.len() {
        let end = data[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |i| pos + i + 1);
        let line = &data[pos..end];

        lines += 1;
        if lines.is_multiple_of(POLL_INTERVAL) {
            if cancel.load(Ordering::Relaxed) || is_shutdown_requested() {
                return Err(MagError::Cancelled {
                    path: path.to_path_buf(),
                });
            }
            pb.set_position(pos as u64);
        }

        if !is_blank(line) {
            let offset = pos as u64;
            let key = extract(line).ok_or_else(|| MagError::InvalidKey {
                path: path.to_path_buf(),
                offset,
            })?;
            match previous {
                Some(prev) if key < prev => {
                    return Err(MagError::SortViolation {
                        path: path.to_path_buf(),
                        offset,
                        previous: prev.to_string(),
                        key: key.to_string(),
                    });
                }
                Some(prev) if key == prev => {}
                _ => {
                    keys.push(key);
                    offsets.push(offset);
                }
            }
            previous = Some(key);
        }
        pos = end;
    }
    pb.set_position(len);

    log::info!(
        "Indexed {}: {} keys over {} lines in {:.1}s",
        path.display(),
        fmt_num(keys.len()),
        fmt_num(lines),
        start.elapsed().as_secs_f64()
    );
    Ok(SortedIndex { keys, offsets })
}
