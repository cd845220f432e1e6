//! Join configuration

use magline_core::default_workers;

use crate::intern::DEFAULT_INTERN_CAPACITY;

/// Which lists a record must have non-empty to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredLists {
    pub authors: bool,
    pub references: bool,
    pub fields: bool,
}

impl RequiredLists {
    /// Require nothing.
    pub const NONE: Self = Self {
        authors: false,
        references: false,
        fields: false,
    };
}

impl Default for RequiredLists {
    fn default() -> Self {
        Self {
            authors: true,
            references: true,
            fields: true,
        }
    }
}

/// Knobs of one join pass.
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// Keep field assignments with a score strictly above this
    pub field_of_study_score_threshold: f64,
    pub required: RequiredLists,
    /// Resolve `JournalId` to a journal name
    pub journals: bool,
    /// Emit `[name, score]` pairs instead of bare names
    pub scored_fields: bool,
    /// Parallel child index builds (capped at 2, one per indexed file)
    pub index_workers: usize,
    pub intern_authors: bool,
    pub intern_capacity: usize,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            field_of_study_score_threshold: 0.0,
            required: RequiredLists::default(),
            journals: true,
            scored_fields: false,
            index_workers: default_workers(),
            intern_authors: true,
            intern_capacity: DEFAULT_INTERN_CAPACITY,
        }
    }
}
