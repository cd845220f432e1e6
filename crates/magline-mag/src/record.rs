//! Joined output record

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Fields of study of a record: names, or `[name, score]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fields {
    Names(Vec<Arc<str>>),
    Scored(Vec<(Arc<str>, f64)>),
}

impl Fields {
    pub fn len(&self) -> usize {
        match self {
            Self::Names(v) => v.len(),
            Self::Scored(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names in order, with or without scores.
    pub fn names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Names(v) => Box::new(v.iter().map(|n| &**n)),
            Self::Scored(v) => Box::new(v.iter().map(|(n, _)| &**n)),
        }
    }
}

impl Default for Fields {
    fn default() -> Self {
        Self::Names(Vec::new())
    }
}

/// One paper with its authors, references, and fields of study.
///
/// Serialized with the MAG column names as keys, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FullRecord {
    pub paper_id: i64,
    pub original_title: Arc<str>,
    pub year: i64,
    pub authors: Vec<Arc<str>>,
    pub references: Vec<i64>,
    pub fields: Fields,
    pub doi: Option<Arc<str>>,
    pub journal: Option<Arc<str>>,
}
