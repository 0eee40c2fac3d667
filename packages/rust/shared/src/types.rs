//! Core domain types shared by the crawler, the reconciliation core and storage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of cell strings as scraped from a table.
pub type Row = Vec<String>;

/// Number of row-scope data markers that encode one logical roster row.
pub const MARKERS_PER_ROW: usize = 4;

// ---------------------------------------------------------------------------
// Row source boundary
// ---------------------------------------------------------------------------

/// Rows scraped from one table, header row first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBatch {
    /// Where the rows came from (URL or label), for diagnostics.
    pub source: String,
    /// All rows including the leading header row.
    pub rows: Vec<Row>,
    /// Count of row-scope data markers seen in the table.
    pub data_markers: usize,
}

impl RowBatch {
    /// The header row, if any.
    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or_default()
    }
}

/// Everything one run needs from the remote source, fetched once.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    /// The general-information table (one row per category).
    pub general: RowBatch,
    /// One batch per category sub-source, in link order.
    pub sub_sources: Vec<RowBatch>,
}

// ---------------------------------------------------------------------------
// Schema diagnostics
// ---------------------------------------------------------------------------

/// Recoverable disagreement between declared headers and parsed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMismatch {
    /// Which table the mismatch was found in.
    pub context: String,
    /// Number of declared column headers.
    pub declared: usize,
    /// Number of columns actually parsed.
    pub parsed: usize,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} declared columns, {} parsed (using positional columns)",
            self.context, self.declared, self.parsed
        )
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A named group of competition entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Raw date as published (`DD.MM` or `DD-MM-YYYY`).
    pub date: String,
    /// Remaining columns (city, organizer, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<String>,
}

/// Lookup table of categories built from the general-information source.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    /// Label of the index column (first header cell).
    pub index_label: String,
    /// Column names, named or positional.
    pub columns: Vec<String>,
    /// Categories in source order.
    pub categories: Vec<Category>,
    /// Set when headers and parsed columns disagreed.
    pub schema_mismatch: Option<SchemaMismatch>,
}

impl CategoryTable {
    /// Category names in the order they were produced.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// One flattened row of the participant roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub cells: Row,
    /// Category back-filled at normalization time.
    pub category: String,
}

/// The flattened participant roster.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    /// Column names, named or positional.
    pub columns: Vec<String>,
    /// Header row as declared by the first sub-source, kept for positional fallback.
    pub declared_header: Row,
    pub entries: Vec<RosterEntry>,
    pub schema_mismatches: Vec<SchemaMismatch>,
}

impl Roster {
    /// Index of `name` among the roster columns, falling back to the declared header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.declared_header.iter().position(|c| c == name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pairs and matches
// ---------------------------------------------------------------------------

/// Two consecutive name tokens, one participant ("Name Surname").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair {
    pub first: String,
    pub second: String,
}

impl Pair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// The space-joined label used for matching.
    pub fn label(&self) -> String {
        format!("{} {}", self.first, self.second)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.second)
    }
}

/// A roster pair carrying the category of the entry it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPair {
    pub pair: Pair,
    pub category: String,
}

/// One row of the external contact roster file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    /// Raw pair string ("Name Surname Name Surname", separators included).
    pub pair: String,
    pub contact: Option<String>,
}

/// A pair from the external contact roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePair {
    pub pair: Pair,
    pub contact: Option<String>,
}

/// One accepted pairing of a roster pair to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Roster-side pair label.
    pub pair: String,
    pub category: String,
    /// Similarity of the accepted candidate.
    pub score: f64,
    /// Contact of the matched candidate, when the roster file has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// A match annotated with whether it was already present in the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffRow {
    pub result: MatchResult,
    pub recurring: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_batch_splits_header() {
        let batch = RowBatch {
            source: "waltz".into(),
            rows: vec![
                vec!["№".into(), "Участники".into()],
                vec!["1".into(), "Иван Петров".into()],
            ],
            data_markers: 4,
        };
        assert_eq!(batch.header().map(Vec::len), Some(2));
        assert_eq!(batch.data_rows().len(), 1);
        assert!(RowBatch::default().data_rows().is_empty());
    }

    #[test]
    fn pair_label_joins_tokens() {
        let pair = Pair::new("Иван", "Петров");
        assert_eq!(pair.label(), "Иван Петров");
        assert_eq!(pair.to_string(), pair.label());
    }

    #[test]
    fn match_result_serialization() {
        let result = MatchResult {
            pair: "Анна Смирнова".into(),
            category: "Waltz".into(),
            score: 0.93,
            contact: None,
        };
        let json = serde_json::to_string(&result).expect("serialize");
        assert!(!json.contains("contact"));
        let parsed: MatchResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, result);
    }

    #[test]
    fn schema_mismatch_display() {
        let m = SchemaMismatch {
            context: "general table".into(),
            declared: 3,
            parsed: 4,
        };
        assert!(m.to_string().contains("positional"));
    }
}
