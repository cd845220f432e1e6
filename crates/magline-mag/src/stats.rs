//! Statistics of join passes and of finished full-record files.
//!
//! - `JoinStats`: counters of one `FullRecords` pass (emitted, rejected by reason)
//! - `RecordStats`: years, fields of study, and reference counts of a JSONL file
//! - `ScoreStats`: distribution of PaperFieldsOfStudy scores

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use magline_core::{fmt_num, is_shutdown_requested, pct};
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::dataset::{DatasetError, JsonlRecords};
use crate::error::MagError;
use crate::record::FullRecord;
use crate::schema;
use crate::source::TsvReader;

/// Widest bar in a histogram table
const BAR_WIDTH: usize = 40;

/// Default number of histogram rows
pub const DEFAULT_BUCKETS: usize = 10;

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

// =============================================================================
// Join pass
// =============================================================================

/// Counters of one join pass.
///
/// Each rejected paper is counted under the first reason that applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinStats {
    pub papers_scanned: usize,
    pub emitted: usize,
    /// Null PaperId or Year, null or empty OriginalTitle
    pub missing_core: usize,
    /// A field id absent from the FieldsOfStudy dictionary
    pub unknown_field: usize,
    pub no_fields: usize,
    pub no_authors: usize,
    pub no_references: usize,
    /// Author lines read from PaperAuthorAffiliations
    pub author_rows: usize,
    /// Reference lines read from PaperReferences
    pub reference_rows: usize,
    pub elapsed: Duration,
}

impl JoinStats {
    pub fn rejected(&self) -> usize {
        self.missing_core + self.unknown_field + self.no_fields + self.no_authors + self.no_references
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = new_table(&["Full records", "Value", "%"]);
        let scanned = self.papers_scanned;
        let mut row = |label: &str, n: usize, color: Option<Color>| {
            let mut cells = vec![
                Cell::new(label),
                Cell::new(fmt_num(n)),
                Cell::new(format!("{:.1}", pct(n, scanned))),
            ];
            if let Some(color) = color {
                cells = cells.into_iter().map(|c| c.fg(color)).collect();
            }
            table.add_row(cells);
        };
        row("Papers scanned", scanned, None);
        row("Missing id/title/year", self.missing_core, None);
        row("Unknown field of study", self.unknown_field, None);
        row("No fields of study", self.no_fields, None);
        row("No authors", self.no_authors, None);
        row("No references", self.no_references, None);
        row("Emitted", self.emitted, Some(Color::Green));
        table.add_row(vec![
            Cell::new("Time"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
            Cell::new(""),
        ]);
        format!("\n{table}")
    }

    /// Log minimal summary (non-TTY mode).
    pub fn log(&self) {
        log::info!(
            "Join complete: {} / {} papers emitted ({:.1}%), {} rejected [{:.1}s]",
            fmt_num(self.emitted),
            fmt_num(self.papers_scanned),
            pct(self.emitted, self.papers_scanned),
            fmt_num(self.rejected()),
            self.elapsed.as_secs_f64()
        );
    }
}

// =============================================================================
// Histograms
// =============================================================================

/// Contiguous key range `lo..=hi` of a histogram with its summed count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub lo: i64,
    pub hi: i64,
    pub count: usize,
}

/// Group an integer histogram into at most `max_buckets` equal-width ranges.
///
/// Histograms with few enough keys keep one bucket per key.
pub fn bucketize(hist: &BTreeMap<i64, usize>, max_buckets: usize) -> Vec<Bucket> {
    let (Some((&min, _)), Some((&max, _))) = (hist.first_key_value(), hist.last_key_value())
    else {
        return Vec::new();
    };
    let max_buckets = max_buckets.max(1);
    if hist.len() <= max_buckets {
        return hist
            .iter()
            .map(|(&k, &count)| Bucket { lo: k, hi: k, count })
            .collect();
    }
    let span = max.abs_diff(min).saturating_add(1);
    let width = i64::try_from(span.div_ceil(max_buckets as u64)).unwrap_or(i64::MAX);
    let mut buckets = Vec::new();
    let mut lo = min;
    while lo <= max {
        let hi = lo.saturating_add(width - 1).min(max);
        let count = hist.range(lo..=hi).map(|(_, &c)| c).sum();
        buckets.push(Bucket { lo, hi, count });
        match hi.checked_add(1) {
            Some(next) => lo = next,
            None => break,
        }
    }
    buckets
}

/// Two-column table with a proportional bar per row.
pub fn histogram_table(label: &str, rows: &[(String, usize)]) -> String {
    let mut table = new_table(&[label, "Count", ""]);
    let peak = rows.iter().map(|(_, c)| *c).max().unwrap_or(0);
    for (name, count) in rows {
        let bar = if peak == 0 {
            0
        } else {
            (*count * BAR_WIDTH).div_ceil(peak)
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(fmt_num(*count)),
            Cell::new("█".repeat(bar)).fg(Color::Green),
        ]);
    }
    table.to_string()
}

fn int_rows(buckets: &[Bucket]) -> Vec<(String, usize)> {
    buckets
        .iter()
        .map(|b| {
            let label = if b.lo == b.hi {
                b.lo.to_string()
            } else {
                format!("{}-{}", b.lo, b.hi)
            };
            (label, b.count)
        })
        .collect()
}

// =============================================================================
// Full-record files
// =============================================================================

/// Contents summary of a full-record JSONL file.
#[derive(Debug, Clone, Default)]
pub struct RecordStats {
    pub total: usize,
    /// Records whose title matched the filter (all records without one)
    pub passed_filter: usize,
    pub years: BTreeMap<i64, usize>,
    pub fields: FxHashMap<String, usize>,
    /// Number of references -> number of records
    pub reference_counts: BTreeMap<i64, usize>,
}

impl RecordStats {
    /// Count `record`; only matching records enter the histograms.
    pub fn add(&mut self, record: &FullRecord, title_filter: Option<&Regex>) {
        self.total += 1;
        if title_filter.is_some_and(|re| !re.is_match(&record.original_title)) {
            return;
        }
        self.passed_filter += 1;
        *self.years.entry(record.year).or_default() += 1;
        for name in record.fields.names() {
            *self.fields.entry(name.to_string()).or_default() += 1;
        }
        *self
            .reference_counts
            .entry(record.references.len() as i64)
            .or_default() += 1;
    }

    /// Fields of study, most frequent first (ties by name).
    pub fn fields_by_frequency(&self) -> Vec<(&str, usize)> {
        let mut fields: Vec<(&str, usize)> =
            self.fields.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        fields.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        fields
    }

    /// Totals followed by the year, field, and reference-count tables.
    pub fn format_report(&self) -> String {
        let fields: Vec<(String, usize)> = self
            .fields_by_frequency()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        format!(
            "Total number of records:\t{}\n\
             Total number of records that passed through the filter:\t{}\n\n\
             Years\n{}\n\nFields of study\n{}\n\nReferences cnt\n{}",
            self.total,
            self.passed_filter,
            histogram_table("Year", &int_rows(&bucketize(&self.years, DEFAULT_BUCKETS))),
            histogram_table("Field", &fields),
            histogram_table(
                "References",
                &int_rows(&bucketize(&self.reference_counts, DEFAULT_BUCKETS))
            ),
        )
    }
}

/// Build a title filter that must match at the start of the title.
pub fn title_filter(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Collect [`RecordStats`] over a full-record JSONL file.
pub fn record_stats(path: &Path, title_filter: Option<&Regex>) -> Result<RecordStats, DatasetError> {
    let mut stats = RecordStats::default();
    for item in JsonlRecords::open(path)? {
        let (_, record) = item?;
        stats.add(&record, title_filter);
    }
    log::info!(
        "Counted {} records of {} ({} passed the filter)",
        fmt_num(stats.total),
        path.display(),
        fmt_num(stats.passed_filter)
    );
    Ok(stats)
}

// =============================================================================
// Field-of-study scores
// =============================================================================

/// Distribution of PaperFieldsOfStudy scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// `floor(score * 10)` -> count, i.e. 0.1-wide bins keyed by tenths
    pub histogram: BTreeMap<i64, usize>,
}

impl ScoreStats {
    /// Compute from raw scores; `None` when there are none.
    ///
    /// NaN and infinite scores are ignored.
    pub fn from_scores(mut scores: Vec<f64>) -> Option<Self> {
        scores.retain(|s| s.is_finite());
        if scores.is_empty() {
            return None;
        }
        let count = scores.len();
        let mean = scores.iter().sum::<f64>() / count as f64;
        let mut histogram = BTreeMap::new();
        for &s in &scores {
            *histogram.entry((s * 10.0).floor() as i64).or_default() += 1;
        }
        scores.sort_unstable_by(f64::total_cmp);
        let mid = count / 2;
        let median = if count % 2 == 1 {
            scores[mid]
        } else {
            (scores[mid - 1] + scores[mid]) / 2.0
        };
        Some(Self {
            count,
            mean,
            median,
            histogram,
        })
    }

    pub fn format_report(&self) -> String {
        let buckets = bucketize(&self.histogram, DEFAULT_BUCKETS.min(self.histogram.len()));
        let rows: Vec<(String, usize)> = buckets
            .iter()
            .map(|b| {
                let lo = b.lo as f64 / 10.0;
                let hi = b.hi.saturating_add(1) as f64 / 10.0;
                (format!("[{lo:.1}, {hi:.1})"), b.count)
            })
            .collect();
        format!(
            "Mean: {}\nMedian: {}\n{}",
            self.mean,
            self.median,
            histogram_table("Score", &rows)
        )
    }
}

/// Score statistics of a PaperFieldsOfStudy file.
///
/// Rows without a parsable score are skipped. An input without any score is
/// reported as `Ok(None)`.
pub fn score_stats(path: &Path) -> Result<Option<ScoreStats>, MagError> {
    let mut scores = Vec::new();
    for row in TsvReader::open(path)?.rows(schema::PAPER_FIELDS_OF_STUDY) {
        if let Some(score) = row?.float("Score") {
            scores.push(score);
            if scores.len().is_multiple_of(1 << 20) && is_shutdown_requested() {
                return Err(MagError::Interrupted);
            }
        }
    }
    Ok(ScoreStats::from_scores(scores))
}
