//! Magline MAG - Full-record join over the Microsoft Academic Graph dump
//!
//! The child files (PaperAuthorAffiliations, PaperReferences) are sorted by
//! PaperId. Each is indexed once (first byte offset per paper), after which a
//! single pass over Papers pulls every paper's authors and references with a
//! binary search and a bounded forward read.

pub mod config;
pub mod dataset;
pub mod dictionary;
pub mod error;
pub mod group;
pub mod handles;
pub mod index;
pub mod intern;
pub mod join;
pub mod locate;
pub mod output;
pub mod record;
pub mod row;
pub mod schema;
pub mod source;
pub mod stats;

// Re-exports
pub use config::{JoinConfig, RequiredLists};
pub use dataset::{DatasetError, JsonlDataset, JsonlRecords};
pub use error::MagError;
pub use group::{GroupReader, read_group};
pub use handles::{HandleGuard, HandlePool};
pub use index::{SortedIndex, build_index, build_index_with, paper_id_key};
pub use intern::Interner;
pub use join::{FullRecords, build_child_indexes, generate_full_records};
pub use locate::locate;
pub use output::RecordWriter;
pub use record::{Fields, FullRecord};
pub use row::{Row, Value};
pub use source::{MagFile, MagPaths, TsvReader};
pub use stats::{JoinStats, RecordStats, ScoreStats};
