//! Pool of open read handles for the indexed child files.
//!
//! A handle is held by exactly one group reader at a time and returned to the
//! pool when the reader is dropped, so handles never leak even when a reader
//! is abandoned half-way.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::error::MagError;

/// Read buffer per handle (64KB)
const HANDLE_BUF_SIZE: usize = 64 * 1024;

/// Buffered file handle that tracks its logical position.
///
/// Seeking to a position inside the current buffer does not touch the file,
/// which keeps consecutive groups of a sorted file cheap to read.
#[derive(Debug)]
pub struct FileHandle {
    reader: BufReader<File>,
    position: u64,
    /// Set after a failed read or seek; the position is no longer trusted
    poisoned: bool,
}

impl FileHandle {
    fn open(path: &Path) -> Result<Self, MagError> {
        let file = File::open(path).map_err(|e| MagError::open(path, e))?;
        Ok(Self {
            reader: BufReader::with_capacity(HANDLE_BUF_SIZE, file),
            position: 0,
            poisoned: false,
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether an I/O error left the handle at an unknown position.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        if offset != self.position {
            let delta = offset as i128 - self.position as i128;
            let result = match i64::try_from(delta) {
                Ok(delta) => self.reader.seek_relative(delta),
                Err(_) => self.reader.seek(SeekFrom::Start(offset)).map(drop),
            };
            if let Err(e) = result {
                self.poisoned = true;
                return Err(e);
            }
            self.position = offset;
        }
        Ok(())
    }

    /// Append the next line (terminator included) to `buf`; 0 at end of file.
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self.reader.read_until(b'\n', buf) {
            Ok(n) => {
                self.position += n as u64;
                Ok(n)
            }
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Step back over the last `n` bytes read.
    pub fn unread(&mut self, n: usize) -> io::Result<()> {
        self.seek_to(self.position - n as u64)
    }
}

/// Idle handles per file path.
#[derive(Debug, Default)]
pub struct HandlePool {
    idle: Mutex<FxHashMap<PathBuf, Vec<FileHandle>>>,
}

impl HandlePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an idle handle for `path` or open a new one.
    pub fn acquire(&self, path: &Path) -> Result<HandleGuard<'_>, MagError> {
        let cached = self
            .idle
            .lock()
            .expect("handle pool poisoned")
            .get_mut(path)
            .and_then(Vec::pop);
        let handle = match cached {
            Some(handle) => handle,
            None => FileHandle::open(path)?,
        };
        Ok(HandleGuard {
            pool: self,
            path: path.to_path_buf(),
            handle: Some(handle),
        })
    }

    /// Handles currently parked in the pool.
    pub fn idle_handles(&self) -> usize {
        self.idle
            .lock()
            .expect("handle pool poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Close all idle handles.
    pub fn clear(&self) {
        self.idle.lock().expect("handle pool poisoned").clear();
    }
}

/// Exclusive use of one [`FileHandle`]; returns it to the pool on drop
/// unless it is poisoned, in which case it is closed.
#[derive(Debug)]
pub struct HandleGuard<'p> {
    pool: &'p HandlePool,
    path: PathBuf,
    handle: Option<FileHandle>,
}

impl HandleGuard<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for HandleGuard<'_> {
    type Target = FileHandle;

    fn deref(&self) -> &FileHandle {
        self.handle.as_ref().expect("handle already released")
    }
}

impl DerefMut for HandleGuard<'_> {
    fn deref_mut(&mut self) -> &mut FileHandle {
        self.handle.as_mut().expect("handle already released")
    }
}

impl Drop for HandleGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take().filter(|h| !h.poisoned) {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.entry(std::mem::take(&mut self.path))
                    .or_default()
                    .push(handle);
            }
        }
    }
}
