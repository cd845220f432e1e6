use std::path::Path;

use magline_core::ProgressContext;
use magline_mag::{
    FullRecord, JoinConfig, JsonlDataset, MagError, RecordWriter, build_child_indexes,
    build_index, generate_full_records, locate,
};
use tempfile::TempDir;

/// Papers row with `id`, `title` (OriginalTitle), and `year`; other columns empty.
fn paper_row(id: i64, title: &str, year: i64) -> String {
    let mut cells = vec![String::new(); 26];
    cells[0] = id.to_string();
    cells[5] = title.to_string();
    cells[7] = year.to_string();
    cells.join("\t")
}

fn write_lines(path: &Path, lines: &[String]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, content).unwrap();
}

/// Two papers; only paper 1 has a field of study.
fn two_paper_dump() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_lines(
        &root.join("mag/Papers.txt"),
        &[paper_row(1, "TitleA", 2020), paper_row(2, "TitleB", 2021)],
    );
    write_lines(
        &root.join("mag/PaperAuthorAffiliations.txt"),
        &["1\t11\t\t1\tA1\t".into(), "2\t12\t\t1\tA2\t".into()],
    );
    write_lines(
        &root.join("mag/PaperReferences.txt"),
        &["1\t9".into(), "2\t9".into()],
    );
    write_lines(&root.join("mag/Journals.txt"), &[]);
    write_lines(
        &root.join("advanced/FieldsOfStudy.txt"),
        &["100\t1\tcomputer science\tComputer Science".into()],
    );
    write_lines(
        &root.join("advanced/PaperFieldsOfStudy.txt"),
        &["1\t100\t0.5".into()],
    );
    dir
}

fn collect(root: &Path, config: &JoinConfig) -> Result<Vec<FullRecord>, MagError> {
    generate_full_records(root, config, &ProgressContext::hidden())?.collect()
}

fn to_jsonl(records: &[FullRecord]) -> Vec<u8> {
    let mut writer: RecordWriter<Vec<u8>, Vec<u8>> = RecordWriter::new(Vec::new(), None).unwrap();
    for record in records {
        writer.write(record).unwrap();
    }
    writer.finish().unwrap().0
}

// =============================================================================
// Join scenarios
// =============================================================================

#[test]
fn only_paper_with_field_is_emitted() {
    let dir = two_paper_dump();
    let records = collect(dir.path(), &JoinConfig::default()).unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.paper_id, 1);
    assert_eq!(&*record.original_title, "TitleA");
    assert_eq!(record.year, 2020);
    assert_eq!(record.authors.len(), 1);
    assert_eq!(&*record.authors[0], "A1");
    assert_eq!(record.references, vec![9]);
    assert!(!record.fields.is_empty());
}

#[test]
fn threshold_above_all_scores_yields_nothing() {
    let dir = two_paper_dump();
    let config = JoinConfig {
        field_of_study_score_threshold: 0.9,
        ..JoinConfig::default()
    };
    assert!(collect(dir.path(), &config).unwrap().is_empty());
}

#[test]
fn unsorted_affiliations_abort_generation() {
    let dir = two_paper_dump();
    let paa = dir.path().join("mag/PaperAuthorAffiliations.txt");
    write_lines(
        &paa,
        &[
            "1\t11\t\t1\tA1\t".into(),
            "1\t13\t\t2\tA3\t".into(),
            "3\t14\t\t1\tA4\t".into(),
            "2\t12\t\t1\tA2\t".into(),
        ],
    );

    assert!(matches!(
        build_index(&paa),
        Err(MagError::SortViolation { .. })
    ));
    match generate_full_records(dir.path(), &JoinConfig::default(), &ProgressContext::hidden()) {
        Err(MagError::SortViolation { path, .. }) => assert_eq!(path, paa),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("generation must not start on unsorted input"),
    }
}

#[test]
fn short_papers_rows_decode_trailing_nulls() {
    let dir = two_paper_dump();
    write_lines(
        &dir.path().join("mag/Papers.txt"),
        &[
            // Title present, Year missing: rejected
            "1\t\t\t\t\tTitleA".into(),
            paper_row(2, "TitleB", 2021),
        ],
    );
    write_lines(
        &dir.path().join("advanced/PaperFieldsOfStudy.txt"),
        &["1\t100\t0.5".into(), "2\t100\t0.5".into()],
    );
    let (records, stats) = {
        let mut records =
            generate_full_records(dir.path(), &JoinConfig::default(), &ProgressContext::hidden())
                .unwrap();
        let out: Vec<FullRecord> = records.by_ref().collect::<Result<_, _>>().unwrap();
        (out, records.stats().clone())
    };
    assert_eq!(records.iter().map(|r| r.paper_id).collect::<Vec<_>>(), [2]);
    assert_eq!(stats.missing_core, 1);
}

#[test]
fn missing_input_is_reported_by_name() {
    let dir = two_paper_dump();
    std::fs::remove_file(dir.path().join("mag/PaperReferences.txt")).unwrap();
    let err = collect(dir.path(), &JoinConfig::default()).unwrap_err();
    assert!(matches!(err, MagError::MissingFile { .. }));
    assert!(err.to_string().contains("PaperReferences.txt"));
}

#[test]
fn gzip_papers_are_accepted() {
    use std::io::Write;

    let dir = two_paper_dump();
    let plain = dir.path().join("mag/Papers.txt");
    let content = std::fs::read(&plain).unwrap();
    std::fs::remove_file(&plain).unwrap();
    let mut gz = flate2::write::GzEncoder::new(
        std::fs::File::create(dir.path().join("mag/Papers.txt.gz")).unwrap(),
        flate2::Compression::default(),
    );
    gz.write_all(&content).unwrap();
    gz.finish().unwrap();

    let records = collect(dir.path(), &JoinConfig::default()).unwrap();
    assert_eq!(records.len(), 1);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn every_record_is_complete() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let papers: Vec<String> = (1..=50)
        .map(|i| {
            if i % 7 == 0 {
                format!("{i}\t\t\t\t\t\t\t2000")
            } else {
                paper_row(i, &format!("Paper {i}"), 1990 + i % 30)
            }
        })
        .collect();
    write_lines(&root.join("mag/Papers.txt"), &papers);
    let authors: Vec<String> = (1..=50)
        .filter(|i| i % 3 != 0)
        .flat_map(|i| (0..i % 4).map(move |k| format!("{i}\t{k}\t\t{k}\tAuthor {}\t", k % 2)))
        .collect();
    write_lines(&root.join("mag/PaperAuthorAffiliations.txt"), &authors);
    let refs: Vec<String> = (1..=50)
        .filter(|i| i % 5 != 0)
        .flat_map(|i| (0..2).map(move |k| format!("{i}\t{}", i * 100 + k)))
        .collect();
    write_lines(&root.join("mag/PaperReferences.txt"), &refs);
    write_lines(&root.join("mag/Journals.txt"), &[]);
    write_lines(
        &root.join("advanced/FieldsOfStudy.txt"),
        &["1\t1\tit\tIT".into(), "2\t1\tmath\tMath".into()],
    );
    let fields: Vec<String> = (1..=50)
        .filter(|i| i % 2 == 0)
        .map(|i| format!("{i}\t{}\t0.{}", 1 + i % 2, i % 9 + 1))
        .collect();
    write_lines(&root.join("advanced/PaperFieldsOfStudy.txt"), &fields);

    let records = collect(root, &JoinConfig::default()).unwrap();
    assert!(!records.is_empty());
    for record in &records {
        assert!(!record.authors.is_empty());
        assert!(!record.references.is_empty());
        assert!(!record.fields.is_empty());
        assert!(!record.original_title.is_empty());
    }
    // Papers file order
    assert!(records.windows(2).all(|w| w[0].paper_id < w[1].paper_id));
}

#[test]
fn two_passes_are_byte_identical() {
    let dir = two_paper_dump();
    let first = to_jsonl(&collect(dir.path(), &JoinConfig::default()).unwrap());
    let second = to_jsonl(&collect(dir.path(), &JoinConfig::default()).unwrap());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn worker_count_does_not_change_output() {
    let dir = two_paper_dump();
    let one = JoinConfig {
        index_workers: 1,
        ..JoinConfig::default()
    };
    let two = JoinConfig {
        index_workers: 2,
        ..JoinConfig::default()
    };
    assert_eq!(
        to_jsonl(&collect(dir.path(), &one).unwrap()),
        to_jsonl(&collect(dir.path(), &two).unwrap())
    );

    let paa = dir.path().join("mag/PaperAuthorAffiliations.txt");
    let refs = dir.path().join("mag/PaperReferences.txt");
    let progress = ProgressContext::hidden();
    assert_eq!(
        build_child_indexes(&paa, &refs, 1, &progress).unwrap(),
        build_child_indexes(&paa, &refs, 2, &progress).unwrap()
    );
}

#[test]
fn index_keys_strictly_increase_and_locate_is_exact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("refs.txt");
    let lines: Vec<String> = [2, 2, 3, 7, 7, 7, 10]
        .iter()
        .map(|k| format!("{k}\t1"))
        .collect();
    write_lines(&path, &lines);

    let index = build_index(&path).unwrap();
    assert!(index.keys().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(locate(index.keys(), &7), Some(2));
    for absent in [1, 5, 11] {
        assert_eq!(locate(index.keys(), &absent), None);
    }
}

// =============================================================================
// Output + dataset reader
// =============================================================================

#[test]
fn written_index_serves_random_access() {
    let dir = two_paper_dump();
    std::fs::write(
        dir.path().join("advanced/PaperFieldsOfStudy.txt"),
        "1\t100\t0.5\n2\t100\t0.6\n",
    )
    .unwrap();
    let records = collect(dir.path(), &JoinConfig::default()).unwrap();
    assert_eq!(records.len(), 2);

    let out = dir.path().join("full.jsonl");
    let index = dir.path().join("full.jsonl.index");
    let mut writer = RecordWriter::new(
        std::fs::File::create(&out).unwrap(),
        Some(std::fs::File::create(&index).unwrap()),
    )
    .unwrap();
    for record in &records {
        writer.write(record).unwrap();
    }
    writer.finish().unwrap();

    let mut scanned = JsonlDataset::open(&out).unwrap();
    let mut indexed = JsonlDataset::open_indexed(&out, &index).unwrap();
    assert_eq!(scanned.len(), 2);
    assert_eq!(indexed.len(), 2);
    for record in &records {
        assert_eq!(&scanned.get(record.paper_id).unwrap(), record);
        assert_eq!(&indexed.get(record.paper_id).unwrap(), record);
    }
}
