//! JSON Lines output with an offset sidecar.

use std::io::{self, Write};

use crate::dataset::INDEX_HEADER;
use crate::record::FullRecord;

/// Writes one record per line and, optionally, `PaperId\toffset` index rows
/// where `offset` is the byte position of the record's line.
pub struct RecordWriter<W: Write, I: Write> {
    out: W,
    index: Option<I>,
    offset: u64,
    line: Vec<u8>,
    written: usize,
}

impl<W: Write, I: Write> RecordWriter<W, I> {
    /// Start a writer; the index header is written immediately.
    pub fn new(out: W, index: Option<I>) -> io::Result<Self> {
        let mut index = index;
        if let Some(index) = index.as_mut() {
            writeln!(index, "{INDEX_HEADER}")?;
        }
        Ok(Self {
            out,
            index,
            offset: 0,
            line: Vec::with_capacity(1024),
            written: 0,
        })
    }

    pub fn write(&mut self, record: &FullRecord) -> io::Result<()> {
        self.line.clear();
        serde_json::to_writer(&mut self.line, record)?;
        self.line.push(b'\n');
        self.out.write_all(&self.line)?;
        if let Some(index) = self.index.as_mut() {
            writeln!(index, "{}\t{}", record.paper_id, self.offset)?;
        }
        self.offset += self.line.len() as u64;
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Bytes of JSONL written so far.
    pub fn bytes_written(&self) -> u64 {
        self.offset
    }

    /// Flush both outputs and hand them back.
    pub fn finish(mut self) -> io::Result<(W, Option<I>)> {
        self.out.flush()?;
        if let Some(index) = self.index.as_mut() {
            index.flush()?;
        }
        Ok((self.out, self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Fields;

    fn record(id: i64) -> FullRecord {
        FullRecord {
            paper_id: id,
            original_title: "T".into(),
            year: 2020,
            authors: vec!["A".into()],
            references: vec![1],
            fields: Fields::Names(vec!["F".into()]),
            doi: None,
            journal: None,
        }
    }

    #[test]
    fn index_points_at_line_starts() {
        let mut writer = RecordWriter::new(Vec::new(), Some(Vec::new())).unwrap();
        writer.write(&record(3)).unwrap();
        writer.write(&record(4)).unwrap();
        assert_eq!(writer.written(), 2);
        let (out, index) = writer.finish().unwrap();

        let out = String::from_utf8(out).unwrap();
        let second_line = out.find("{\"PaperId\":4").unwrap();
        let index = String::from_utf8(index.unwrap()).unwrap();
        assert_eq!(index, format!("key\tfile_line_offset\n3\t0\n4\t{second_line}\n"));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn without_index() {
        let mut writer: RecordWriter<Vec<u8>, Vec<u8>> = RecordWriter::new(Vec::new(), None).unwrap();
        writer.write(&record(1)).unwrap();
        let bytes = writer.bytes_written();
        let (out, index) = writer.finish().unwrap();
        assert_eq!(out.len() as u64, bytes);
        assert!(index.is_none());
    }
}
