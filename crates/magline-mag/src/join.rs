//! Record join engine.
//!
//! Initialization indexes the two child files (in parallel) and loads the
//! field and journal dictionaries; the returned [`FullRecords`] then walks
//! Papers once and pulls each paper's authors and references by seeking into
//! the child files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use magline_core::{ProgressContext, fmt_num, is_shutdown_requested, run_tasks};

use crate::config::JoinConfig;
use crate::dictionary::{self, NameDictionary, PaperFields};
use crate::error::MagError;
use crate::group::GroupReader;
use crate::handles::HandlePool;
use crate::index::{SortedIndex, build_index_with, paper_id_key};
use crate::intern::Interner;
use crate::record::{Fields, FullRecord};
use crate::row::{Row, Value};
use crate::schema::{PAPER_AUTHOR_AFFILIATIONS, PAPER_REFERENCES, PAPERS};
use crate::source::{MagFile, MagPaths, TsvReader};
use crate::stats::JoinStats;

/// Papers between progress updates
const UPDATE_INTERVAL: usize = 16 * 1024;

/// Child indexes are built by at most this many workers (one per file)
const MAX_INDEX_WORKERS: usize = 2;

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Index PaperAuthorAffiliations and PaperReferences on up to `workers` threads.
///
/// The first failure cancels the other scan and is returned.
pub fn build_child_indexes(
    authors_path: &Path,
    references_path: &Path,
    workers: usize,
    progress: &ProgressContext,
) -> Result<(SortedIndex, SortedIndex), MagError> {
    let tasks = vec![authors_path, references_path];
    let workers = workers.min(MAX_INDEX_WORKERS);
    log::info!("Indexing child files with {workers} worker(s)");

    let built = run_tasks(workers, tasks, |path, cancel| {
        let name = path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let pb = progress.scan_bar(&name, file_len(path));
        let result = build_index_with(path, paper_id_key, cancel, &pb);
        pb.finish_and_clear();
        result
    })?;
    let mut built = built.into_iter();
    match (built.next(), built.next()) {
        (Some(authors), Some(references)) => Ok((authors, references)),
        _ => unreachable!("run_tasks returns one result per task"),
    }
}

/// Build the join state under `root` and return the record stream.
///
/// Every required input is checked before any scanning starts.
pub fn generate_full_records(
    root: &Path,
    config: &JoinConfig,
    progress: &ProgressContext,
) -> Result<FullRecords, MagError> {
    let start = Instant::now();
    let paths = MagPaths::new(root);
    let papers_path = paths.resolve(MagFile::Papers)?;
    let authors_path = paths.resolve(MagFile::PaperAuthorAffiliations)?;
    let references_path = paths.resolve(MagFile::PaperReferences)?;
    let fields_path = paths.resolve(MagFile::FieldsOfStudy)?;
    let paper_fields_path = paths.resolve(MagFile::PaperFieldsOfStudy)?;
    let journals_path = if config.journals {
        Some(paths.resolve(MagFile::Journals)?)
    } else {
        None
    };

    let (authors, references) = build_child_indexes(
        &authors_path,
        &references_path,
        config.index_workers,
        progress,
    )?;

    let scan_bar = |path: &Path, file: MagFile| progress.scan_bar(file.file_name(), file_len(path));

    let pb = scan_bar(&fields_path, MagFile::FieldsOfStudy);
    let fields_of_study = dictionary::load_fields_of_study(&fields_path, &pb)?;
    pb.finish_and_clear();

    let pb = scan_bar(&paper_fields_path, MagFile::PaperFieldsOfStudy);
    let paper_fields = dictionary::load_paper_fields(
        &paper_fields_path,
        config.field_of_study_score_threshold,
        &pb,
    )?;
    pb.finish_and_clear();

    let journals = match journals_path {
        Some(path) => {
            let pb = scan_bar(&path, MagFile::Journals);
            let journals = dictionary::load_journals(&path, &pb)?;
            pb.finish_and_clear();
            Some(journals)
        }
        None => None,
    };

    log::info!(
        "Join state ready in {:.1}s: {} author groups, {} reference groups, {} papers with fields",
        start.elapsed().as_secs_f64(),
        fmt_num(authors.len()),
        fmt_num(references.len()),
        fmt_num(paper_fields.len())
    );

    let papers = TsvReader::open(&papers_path)?;
    let stage = progress.scan_bar(MagFile::Papers.file_name(), papers.total_bytes());
    let interner = if config.intern_authors {
        Interner::new(config.intern_capacity)
    } else {
        Interner::disabled()
    };

    Ok(FullRecords {
        papers,
        authors_path,
        references_path,
        authors,
        references,
        fields_of_study,
        paper_fields,
        journals,
        handles: HandlePool::new(),
        interner,
        config: config.clone(),
        stats: JoinStats::default(),
        started: Instant::now(),
        stage,
        finished: false,
    })
}

/// Single-pass stream of joined records in Papers file order.
///
/// Fatal errors are yielded once, after which the stream ends.
pub struct FullRecords {
    papers: TsvReader,
    authors_path: PathBuf,
    references_path: PathBuf,
    authors: SortedIndex,
    references: SortedIndex,
    fields_of_study: NameDictionary,
    paper_fields: PaperFields,
    journals: Option<NameDictionary>,
    handles: HandlePool,
    interner: Interner,
    config: JoinConfig,
    stats: JoinStats,
    started: Instant,
    stage: ProgressBar,
    finished: bool,
}

/// Why a paper produced no record.
enum Rejection {
    MissingCore,
    UnknownField,
    NoFields,
    NoAuthors,
    NoReferences,
}

impl FullRecords {
    /// Counters of the pass so far.
    pub fn stats(&self) -> &JoinStats {
        &self.stats
    }

    fn reject(&mut self, paper_id: Option<i64>, reason: Rejection) {
        let (counter, label) = match reason {
            Rejection::MissingCore => (&mut self.stats.missing_core, "missing id, title or year"),
            Rejection::UnknownField => (&mut self.stats.unknown_field, "unknown field of study"),
            Rejection::NoFields => (&mut self.stats.no_fields, "no fields of study"),
            Rejection::NoAuthors => (&mut self.stats.no_authors, "no authors"),
            Rejection::NoReferences => (&mut self.stats.no_references, "no references"),
        };
        *counter += 1;
        log::debug!("Skipping paper {paper_id:?}: {label}");
    }

    /// Field names (and scores) of `paper_id`; `None` if one is not in the dictionary.
    fn resolve_fields(&self, paper_id: i64) -> Option<Fields> {
        let Some(assigned) = self.paper_fields.get(&paper_id) else {
            return Some(Fields::default());
        };
        let name = |field_id: i64| self.fields_of_study.get(&field_id).map(Arc::clone);
        if self.config.scored_fields {
            assigned
                .iter()
                .map(|f| name(f.field_id).map(|n| (n, f.score)))
                .collect::<Option<Vec<_>>>()
                .map(Fields::Scored)
        } else {
            assigned
                .iter()
                .map(|f| name(f.field_id))
                .collect::<Option<Vec<_>>>()
                .map(Fields::Names)
        }
    }

    fn read_authors(&mut self, paper_id: i64) -> Result<Vec<Arc<str>>, MagError> {
        let Some(offset) = self.authors.offset_of(&paper_id) else {
            return Ok(Vec::new());
        };
        let group = GroupReader::open(
            &self.handles,
            &self.authors_path,
            offset,
            paper_id,
            PAPER_AUTHOR_AFFILIATIONS,
            "OriginalAuthor",
            &mut self.interner,
        )?;
        let mut authors = Vec::new();
        for value in group {
            self.stats.author_rows += 1;
            if let Some(name) = value?.into_str() {
                authors.push(name);
            }
        }
        Ok(authors)
    }

    fn read_references(&mut self, paper_id: i64) -> Result<Vec<i64>, MagError> {
        let Some(offset) = self.references.offset_of(&paper_id) else {
            return Ok(Vec::new());
        };
        let group = GroupReader::open(
            &self.handles,
            &self.references_path,
            offset,
            paper_id,
            PAPER_REFERENCES,
            "PaperReferenceId",
            &mut self.interner,
        )?;
        let mut references = Vec::new();
        for value in group {
            self.stats.reference_rows += 1;
            if let Value::Int(id) = value? {
                references.push(id);
            }
        }
        Ok(references)
    }

    /// Join one Papers row; `Ok(None)` when the paper is rejected.
    fn join(&mut self, mut row: Row) -> Result<Option<FullRecord>, MagError> {
        let paper_id = row.int("PaperId");
        let title = row.take("OriginalTitle").into_str().filter(|t| !t.is_empty());
        let (Some(id), Some(original_title), Some(year)) = (paper_id, title, row.int("Year")) else {
            self.reject(paper_id, Rejection::MissingCore);
            return Ok(None);
        };
        let required = self.config.required;

        let Some(fields) = self.resolve_fields(id) else {
            self.reject(paper_id, Rejection::UnknownField);
            return Ok(None);
        };
        if required.fields && fields.is_empty() {
            self.reject(paper_id, Rejection::NoFields);
            return Ok(None);
        }

        let authors = self.read_authors(id)?;
        if required.authors && authors.is_empty() {
            self.reject(paper_id, Rejection::NoAuthors);
            return Ok(None);
        }

        let references = self.read_references(id)?;
        if required.references && references.is_empty() {
            self.reject(paper_id, Rejection::NoReferences);
            return Ok(None);
        }

        let doi = row.take("Doi").into_str().filter(|d| !d.is_empty());
        let journal = match (&self.journals, row.int("JournalId")) {
            (Some(journals), Some(journal_id)) => journals.get(&journal_id).cloned(),
            _ => None,
        };

        Ok(Some(FullRecord {
            paper_id: id,
            original_title,
            year,
            authors,
            references,
            fields,
            doi,
            journal,
        }))
    }

    fn update_progress(&self) {
        self.stage.set_position(self.papers.bytes_read());
        self.stage.set_message(format!(
            "{} / {} papers",
            fmt_num(self.stats.emitted),
            fmt_num(self.stats.papers_scanned)
        ));
    }

    fn finish(&mut self) {
        self.finished = true;
        self.stats.elapsed = self.started.elapsed();
        self.stage.finish_and_clear();
        self.handles.clear();
        log::debug!(
            "Interner held {} names, {} lookups shared",
            fmt_num(self.interner.len()),
            self.interner.hits()
        );
        self.stats.log();
    }

    fn fail(&mut self, e: MagError) -> Option<Result<FullRecord, MagError>> {
        self.finish();
        Some(Err(e))
    }
}

impl Iterator for FullRecords {
    type Item = Result<FullRecord, MagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if is_shutdown_requested() {
                return self.fail(MagError::Interrupted);
            }
            let next = self
                .papers
                .next_line()
                .map(|line| line.map(|l| Row::decode(&l, PAPERS)));
            let row = match next {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.finish();
                    return None;
                }
                Err(e) => return self.fail(e),
            };
            self.stats.papers_scanned += 1;
            if self.stats.papers_scanned.is_multiple_of(UPDATE_INTERVAL) {
                self.update_progress();
            }
            match self.join(row) {
                Ok(Some(record)) => {
                    self.stats.emitted += 1;
                    return Some(Ok(record));
                }
                Ok(None) => {}
                Err(e) => return self.fail(e),
            }
        }
    }
}
