//! Column layouts of the MAG flat files.
//!
//! Files carry no header row, so the position in these slices is the column's
//! position on the line.

/// Primitive type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Str,
}

/// Named, typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

/// Ordered column list of one file.
pub type Schema = [Column];

const fn int(name: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Int,
    }
}

const fn float(name: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Float,
    }
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        ty: ColumnType::Str,
    }
}

/// Position of `name` in `schema`.
pub fn column_index(schema: &Schema, name: &str) -> Option<usize> {
    schema.iter().position(|c| c.name == name)
}

pub const PAPERS: &Schema = &[
    int("PaperId"),
    int("Rank"),
    text("Doi"),
    text("DocType"),
    text("PaperTitle"),
    text("OriginalTitle"),
    text("BookTitle"),
    int("Year"),
    text("Date"),
    text("OnlineDate"),
    text("Publisher"),
    int("JournalId"),
    int("ConferenceSeriesId"),
    int("ConferenceInstanceId"),
    text("Volume"),
    text("Issue"),
    text("FirstPage"),
    text("LastPage"),
    int("ReferenceCount"),
    int("CitationCount"),
    int("EstimatedCitation"),
    text("OriginalVenue"),
    int("FamilyId"),
    int("FamilyRank"),
    text("DocSubTypes"),
    text("CreatedDate"),
];

pub const PAPER_AUTHOR_AFFILIATIONS: &Schema = &[
    int("PaperId"),
    int("AuthorId"),
    int("AffiliationId"),
    int("AuthorSequenceNumber"),
    text("OriginalAuthor"),
    text("OriginalAffiliation"),
];

pub const PAPER_REFERENCES: &Schema = &[int("PaperId"), int("PaperReferenceId")];

pub const FIELDS_OF_STUDY: &Schema = &[
    int("FieldOfStudyId"),
    int("Rank"),
    text("NormalizedName"),
    text("DisplayName"),
    text("MainType"),
    int("Level"),
    int("PaperCount"),
    int("PaperFamilyCount"),
    int("CitationCount"),
    text("CreatedDate"),
];

pub const PAPER_FIELDS_OF_STUDY: &Schema =
    &[int("PaperId"), int("FieldOfStudyId"), float("Score")];

pub const JOURNALS: &Schema = &[
    int("JournalId"),
    int("Rank"),
    text("NormalizedName"),
    text("DisplayName"),
    text("Issn"),
    text("Publisher"),
    text("Webpage"),
    int("PaperCount"),
    int("PaperFamilyCount"),
    int("CitationCount"),
    text("CreatedDate"),
];
