//! In-memory lookups built by one sequential scan each.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use magline_core::{fmt_num, is_shutdown_requested};
use rustc_hash::FxHashMap;

use crate::error::MagError;
use crate::row::Row;
use crate::schema::{self, Schema};
use crate::source::{Rows, TsvReader};

/// Rows between progress updates and shutdown polls
const UPDATE_INTERVAL: usize = 64 * 1024;

/// Id to display name (fields of study, journals).
pub type NameDictionary = FxHashMap<i64, Arc<str>>;

/// One field assignment of a paper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScore {
    pub field_id: i64,
    pub score: f64,
}

/// Paper id to its field assignments, in file order.
pub type PaperFields = FxHashMap<i64, Vec<FieldScore>>;

/// Drive `rows` to the end, updating `pb` and honoring shutdown.
fn scan(mut rows: Rows, pb: &ProgressBar, mut each: impl FnMut(Row)) -> Result<usize, MagError> {
    let mut count = 0usize;
    while let Some(row) = rows.next() {
        each(row?);
        count += 1;
        if count.is_multiple_of(UPDATE_INTERVAL) {
            if is_shutdown_requested() {
                return Err(MagError::Interrupted);
            }
            pb.set_position(rows.reader().bytes_read());
        }
    }
    pb.set_position(rows.reader().total_bytes());
    Ok(count)
}

/// Map `id_column` to `name_column` over a whole file.
///
/// Rows with a null id or null name are skipped; a repeated id keeps the last name.
pub fn load_names(
    path: &Path,
    schema: &'static Schema,
    id_column: &str,
    name_column: &str,
    pb: &ProgressBar,
) -> Result<NameDictionary, MagError> {
    let start = Instant::now();
    let mut names = NameDictionary::default();
    let rows = TsvReader::open(path)?.rows(schema);
    let total = scan(rows, pb, |mut row| {
        if let (Some(id), Some(name)) = (row.int(id_column), row.take(name_column).into_str()) {
            names.insert(id, name);
        }
    })?;
    log::info!(
        "Loaded {} names from {} ({} rows) in {:.1}s",
        fmt_num(names.len()),
        path.display(),
        fmt_num(total),
        start.elapsed().as_secs_f64()
    );
    Ok(names)
}

/// `FieldOfStudyId -> DisplayName`
pub fn load_fields_of_study(path: &Path, pb: &ProgressBar) -> Result<NameDictionary, MagError> {
    load_names(path, schema::FIELDS_OF_STUDY, "FieldOfStudyId", "DisplayName", pb)
}

/// `JournalId -> DisplayName`
pub fn load_journals(path: &Path, pb: &ProgressBar) -> Result<NameDictionary, MagError> {
    load_names(path, schema::JOURNALS, "JournalId", "DisplayName", pb)
}

/// Field assignments with a score strictly above `threshold`.
///
/// Rows with a null paper id, field id, or score are skipped.
pub fn load_paper_fields(
    path: &Path,
    threshold: f64,
    pb: &ProgressBar,
) -> Result<PaperFields, MagError> {
    let start = Instant::now();
    let mut fields = PaperFields::default();
    let mut kept = 0usize;
    let rows = TsvReader::open(path)?.rows(schema::PAPER_FIELDS_OF_STUDY);
    let total = scan(rows, pb, |row| {
        let (Some(paper_id), Some(field_id), Some(score)) = (
            row.int("PaperId"),
            row.int("FieldOfStudyId"),
            row.float("Score"),
        ) else {
            return;
        };
        if score > threshold {
            fields
                .entry(paper_id)
                .or_default()
                .push(FieldScore { field_id, score });
            kept += 1;
        }
    })?;
    log::info!(
        "Loaded {} field assignments above {threshold} for {} papers ({} rows) in {:.1}s",
        fmt_num(kept),
        fmt_num(fields.len()),
        fmt_num(total),
        start.elapsed().as_secs_f64()
    );
    Ok(fields)
}
