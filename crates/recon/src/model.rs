use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

/// Text that marks "no date" in sources that carry one.
pub const NO_DATE_SENTINEL: &str = "0000-00-00";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Column reference: header name (case-insensitive) or zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Index(usize),
    Name(String),
}

impl FieldRef {
    pub fn name(name: &str) -> Self {
        Self::Name(name.to_uppercase())
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A single row from a delimited source. Headers are shared by every row of
/// the same source and already case-folded to uppercase.
#[derive(Debug, Clone)]
pub struct RowRecord {
    /// 1-based record number within the source file.
    pub row_num: usize,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RowRecord {
    pub fn new(row_num: usize, headers: Arc<[String]>, values: Vec<String>) -> Self {
        Self { row_num, headers, values }
    }

    /// Value under `column`, or `None` when the header is unknown or the row
    /// is too short to reach it.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self
            .headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))?;
        self.values.get(idx).map(String::as_str)
    }

    pub fn field(&self, field: &FieldRef) -> Option<&str> {
        match field {
            FieldRef::Index(i) => self.values.get(*i).map(String::as_str),
            FieldRef::Name(name) => self.get(name),
        }
    }

    /// Value under `column`, empty when absent. Used for report projection.
    pub fn text(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Per-name date key. `NoDate` keeps the sentinel distinct from every real
/// calendar date; it sorts first and never takes part in window comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateKey {
    NoDate,
    On(NaiveDate),
}

impl DateKey {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::NoDate => None,
            Self::On(d) => Some(*d),
        }
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDate => f.write_str(NO_DATE_SENTINEL),
            Self::On(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

// ---------------------------------------------------------------------------
// Index entries
// ---------------------------------------------------------------------------

/// A row that made it into an identity index, with its derived fields.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub name_key: String,
    /// Name as typed in the source, used for display and output ordering.
    pub display_name: String,
    pub date: DateKey,
    /// Date as typed in the source.
    pub date_text: String,
    pub cancelled: bool,
    pub record: RowRecord,
}

impl IndexedRecord {
    pub fn row_num(&self) -> usize {
        self.record.row_num
    }
}

/// Why a row was left out of an index. None of these abort the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIssue {
    MissingField { row_num: usize, column: String },
    BadDate { row_num: usize, value: String },
    Duplicate { row_num: usize, name: String, date: DateKey, kept_row: usize },
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { row_num, column } => {
                write!(f, "row {row_num}: missing required field '{column}'")
            }
            Self::BadDate { row_num, value } => {
                write!(f, "row {row_num}: cannot parse date '{value}'")
            }
            Self::Duplicate { row_num, name, date, kept_row } => write!(
                f,
                "row {row_num}: duplicate entry for patient: {name} with date: {date} (keeping row {kept_row})"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A record selected for human review.
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub entry: IndexedRecord,
    pub comment: Option<String>,
    /// Prescription end date, for the prescription report only.
    pub rx_end_date: Option<DateKey>,
}

impl OutputRow {
    pub fn flagged(entry: &IndexedRecord, comment: impl Into<String>) -> Self {
        Self {
            entry: entry.clone(),
            comment: Some(comment.into()),
            rx_end_date: None,
        }
    }

    pub fn plain(entry: &IndexedRecord) -> Self {
        Self {
            entry: entry.clone(),
            comment: None,
            rx_end_date: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconSummary {
    /// Distinct normalized names in the primary source.
    pub primary_names: usize,
    pub exact_links: usize,
    pub prefix_links: usize,
    /// Primary names with zero or several link candidates.
    pub unlinked_names: usize,
    pub rows_emitted: usize,
    pub primary_rejected: usize,
    pub secondary_rejected: usize,
}

#[derive(Debug, Clone)]
pub struct ReconResult {
    pub rows: Vec<OutputRow>,
    pub summary: ReconSummary,
}
