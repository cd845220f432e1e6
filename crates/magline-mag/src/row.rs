//! Typed decoding of one TSV line

use std::sync::Arc;

use crate::schema::{ColumnType, Schema, column_index};

/// One decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_str(self) -> Option<Arc<str>> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Decode a single raw cell. Numeric cells that fail to parse are `Null`.
pub(crate) fn decode_cell(
    ty: ColumnType,
    raw: &str,
    text: impl FnOnce(&str) -> Arc<str>,
) -> Value {
    match ty {
        ColumnType::Int => raw.trim().parse().map_or(Value::Null, Value::Int),
        ColumnType::Float => raw.trim().parse().map_or(Value::Null, Value::Float),
        ColumnType::Str => Value::Str(text(raw)),
    }
}

/// Strip the line terminator (`\n` or `\r\n`).
pub(crate) fn trim_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Cell `idx` of `line` decoded as `schema[idx]`; `Null` when the line is too short.
pub(crate) fn decode_column(
    line: &str,
    schema: &Schema,
    idx: usize,
    text: impl FnOnce(&str) -> Arc<str>,
) -> Value {
    match trim_eol(line).split('\t').nth(idx) {
        Some(raw) => decode_cell(schema[idx].ty, raw, text),
        None => Value::Null,
    }
}

/// A line decoded against a fixed schema.
///
/// Never fails: a short line yields `Null` for the missing column and every
/// column after it; an unparsable numeric cell yields `Null` for that cell.
#[derive(Debug, Clone)]
pub struct Row {
    schema: &'static Schema,
    values: Vec<Value>,
}

impl Row {
    pub fn decode(line: &str, schema: &'static Schema) -> Self {
        let mut cells = trim_eol(line).split('\t');
        let values = schema
            .iter()
            .map(|column| match cells.next() {
                Some(raw) => decode_cell(column.ty, raw, |s| Arc::from(s)),
                None => Value::Null,
            })
            .collect();
        Self { schema, values }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Value of column `name`; `Null` for names outside the schema.
    pub fn get(&self, name: &str) -> &Value {
        column_index(self.schema, name)
            .and_then(|i| self.values.get(i))
            .unwrap_or(&Value::Null)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).as_int()
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).as_float()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    /// Take ownership of column `name`.
    pub fn take(&mut self, name: &str) -> Value {
        match column_index(self.schema, name).and_then(|i| self.values.get_mut(i)) {
            Some(v) => std::mem::replace(v, Value::Null),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PAPER_AUTHOR_AFFILIATIONS, PAPER_FIELDS_OF_STUDY, PAPERS};

    #[test]
    fn full_line() {
        let row = Row::decode("7\t3\t11\t1\tAda Lovelace\tAnalytical Society\n", PAPER_AUTHOR_AFFILIATIONS);
        assert_eq!(row.int("PaperId"), Some(7));
        assert_eq!(row.int("AffiliationId"), Some(11));
        assert_eq!(row.str("OriginalAuthor"), Some("Ada Lovelace"));
        assert_eq!(row.str("OriginalAffiliation"), Some("Analytical Society"));
    }

    #[test]
    fn crlf_is_stripped() {
        let row = Row::decode("1\t2\t0.25\r\n", PAPER_FIELDS_OF_STUDY);
        assert_eq!(row.float("Score"), Some(0.25));
    }

    #[test]
    fn short_line_nulls_trailing_columns() {
        let row = Row::decode("5\t1\t10.1/x\tJournal\tt\tOriginal", PAPERS);
        assert_eq!(row.int("PaperId"), Some(5));
        assert_eq!(row.str("OriginalTitle"), Some("Original"));
        assert!(row.get("BookTitle").is_null());
        assert!(row.get("Year").is_null());
        assert!(row.get("CreatedDate").is_null());
    }

    #[test]
    fn empty_int_cell_is_null_but_rest_survives() {
        let row = Row::decode("7\t3\t\t1\tAda\t", PAPER_AUTHOR_AFFILIATIONS);
        assert!(row.get("AffiliationId").is_null());
        assert_eq!(row.int("AuthorSequenceNumber"), Some(1));
        assert_eq!(row.str("OriginalAuthor"), Some("Ada"));
        assert_eq!(row.str("OriginalAffiliation"), Some(""));
    }

    #[test]
    fn garbage_numbers_are_null() {
        let row = Row::decode("x\t2\tnot-a-float", PAPER_FIELDS_OF_STUDY);
        assert!(row.get("PaperId").is_null());
        assert_eq!(row.int("FieldOfStudyId"), Some(2));
        assert!(row.get("Score").is_null());
    }

    #[test]
    fn unknown_column_is_null() {
        let row = Row::decode("1\t2\t0.5", PAPER_FIELDS_OF_STUDY);
        assert!(row.get("Nope").is_null());
    }

    #[test]
    fn take_moves_value_out() {
        let mut row = Row::decode("1\t2\t3\t4\tName\t", PAPER_AUTHOR_AFFILIATIONS);
        assert_eq!(row.take("OriginalAuthor").as_str(), Some("Name"));
        assert!(row.get("OriginalAuthor").is_null());
    }

    #[test]
    fn decode_single_column() {
        let line = "9\t8\t\t1\tGrace Hopper\tNavy\n";
        let v = decode_column(line, PAPER_AUTHOR_AFFILIATIONS, 4, |s| Arc::from(s));
        assert_eq!(v.as_str(), Some("Grace Hopper"));
        let short = decode_column("9\t8", PAPER_AUTHOR_AFFILIATIONS, 4, |s| Arc::from(s));
        assert!(short.is_null());
    }
}
