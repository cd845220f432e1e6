//! Bounded group reader.
//!
//! Starting at a key's first-line offset, yields one projected column of each
//! following line while the line's key still equals the target, then stops
//! without consuming the next group.

use std::path::Path;

use crate::error::MagError;
use crate::handles::{HandleGuard, HandlePool};
use crate::index::{is_blank, paper_id_key};
use crate::intern::Interner;
use crate::row::{Value, decode_column};
use crate::schema::{Schema, column_index};

/// Lazy, finite sequence of `column` values for the lines keyed `key`.
///
/// Holds a pooled handle for its whole lifetime; dropping the reader, whether
/// exhausted or not, gives the handle back.
pub struct GroupReader<'a> {
    handle: HandleGuard<'a>,
    key: i64,
    schema: &'static Schema,
    column: usize,
    interner: &'a mut Interner,
    buf: Vec<u8>,
    done: bool,
}

impl<'a> GroupReader<'a> {
    /// Position a reader at `offset` of `path`.
    ///
    /// # Panics
    ///
    /// If `column` is not part of `schema`.
    pub fn open(
        pool: &'a HandlePool,
        path: &Path,
        offset: u64,
        key: i64,
        schema: &'static Schema,
        column: &str,
        interner: &'a mut Interner,
    ) -> Result<Self, MagError> {
        let column = column_index(schema, column)
            .unwrap_or_else(|| panic!("column {column} is not in the schema"));
        let mut handle = pool.acquire(path)?;
        handle
            .seek_to(offset)
            .map_err(|e| MagError::io(path, e))?;
        Ok(Self {
            handle,
            key,
            schema,
            column,
            interner,
            buf: Vec::with_capacity(256),
            done: false,
        })
    }

    fn fail(&mut self, e: std::io::Error) -> Option<Result<Value, MagError>> {
        self.done = true;
        Some(Err(MagError::io(self.handle.path(), e)))
    }
}

impl Iterator for GroupReader<'_> {
    type Item = Result<Value, MagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        // Blank lines belong to no group
        let n = loop {
            self.buf.clear();
            match self.handle.read_line(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) if !is_blank(&self.buf) => break n,
                Ok(_) => {}
                Err(e) => return self.fail(e),
            }
        };
        if paper_id_key(&self.buf) != Some(self.key) {
            // Leave the handle at the start of the next group
            self.done = true;
            return match self.handle.unread(n) {
                Ok(()) => None,
                Err(e) => self.fail(e),
            };
        }
        let line = String::from_utf8_lossy(&self.buf);
        let interner = &mut *self.interner;
        Some(Ok(decode_column(&line, self.schema, self.column, |s| {
            interner.intern(s)
        })))
    }
}

/// Collect the group as a vector, see [`GroupReader`].
pub fn read_group(
    pool: &HandlePool,
    path: &Path,
    offset: u64,
    key: i64,
    schema: &'static Schema,
    column: &str,
    interner: &mut Interner,
) -> Result<Vec<Value>, MagError> {
    GroupReader::open(pool, path, offset, key, schema, column, interner)?.collect()
}
