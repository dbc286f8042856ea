//! Two-level identity index: normalized name -> appointment date -> record.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::SourceConfig;
use crate::model::{DateKey, IndexedRecord, RowIssue, RowRecord};
use crate::normalize::normalize;

/// Records of one name, keyed and ordered by date.
pub type DateMap = BTreeMap<DateKey, IndexedRecord>;

/// At most one record per (normalized name, date). Names iterate in key
/// order and dates ascending; insertion order never affects the result
/// except that the first record for a pair is the one kept.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    entries: BTreeMap<String, DateMap>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` unless its (name, date) pair is taken. On a clash the
    /// existing record stays and its row number is returned.
    pub fn insert(&mut self, entry: IndexedRecord) -> Result<(), usize> {
        let dates = self.entries.entry(entry.name_key.clone()).or_default();
        match dates.entry(entry.date) {
            Entry::Occupied(existing) => Err(existing.get().row_num()),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    pub fn get(&self, name_key: &str) -> Option<&DateMap> {
        self.entries.get(name_key)
    }

    /// The stored key equal to `name_key`, borrowed from the index.
    pub fn key(&self, name_key: &str) -> Option<&str> {
        self.entries.get_key_value(name_key).map(|(k, _)| k.as_str())
    }

    pub fn contains_name(&self, name_key: &str) -> bool {
        self.entries.contains_key(name_key)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DateMap)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of retained records across all names.
    pub fn record_count(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }
}

/// Result of indexing one source: the index plus every row left out of it.
#[derive(Debug, Clone, Default)]
pub struct IndexBuild {
    pub index: IdentityIndex,
    pub issues: Vec<RowIssue>,
}

/// Parse a date field. `None` means unparsable.
pub fn parse_date_key(value: &str, format: &str, sentinel: Option<&str>) -> Option<DateKey> {
    if sentinel == Some(value) {
        return Some(DateKey::NoDate);
    }
    NaiveDate::parse_from_str(value, format).ok().map(DateKey::On)
}

/// Index `records` in source order. Bad rows are skipped and reported,
/// never fatal.
pub fn build_index<I>(source_name: &str, records: I, source: &SourceConfig) -> IndexBuild
where
    I: IntoIterator<Item = RowRecord>,
{
    let mut build = IndexBuild::default();

    for record in records {
        match index_entry(record, source) {
            Ok(entry) => {
                let row_num = entry.row_num();
                let name = entry.display_name.clone();
                let date = entry.date;
                if let Err(kept_row) = build.index.insert(entry) {
                    build.issues.push(RowIssue::Duplicate { row_num, name, date, kept_row });
                }
            }
            Err(issue) => build.issues.push(issue),
        }
    }

    for issue in &build.issues {
        log::warn!("{source_name}: {issue}");
    }
    log::info!(
        "{source_name}: indexed {} record(s) under {} name(s), {} rejected",
        build.index.record_count(),
        build.index.len(),
        build.issues.len()
    );

    build
}

fn index_entry(record: RowRecord, source: &SourceConfig) -> Result<IndexedRecord, RowIssue> {
    let row_num = record.row_num;
    let missing = |column: String| RowIssue::MissingField { row_num, column };

    let display_name = record
        .field(&source.name_column)
        .ok_or_else(|| missing(source.name_column.to_string()))?
        .to_string();

    let date_text = match record.field(&source.date_column) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return Err(missing(source.date_column.to_string())),
    };

    let date = parse_date_key(&date_text, &source.date_format, source.no_date_sentinel.as_deref())
        .ok_or_else(|| RowIssue::BadDate {
            row_num,
            value: date_text.clone(),
        })?;

    let cancelled = source
        .status_column
        .as_ref()
        .and_then(|col| record.field(col))
        .is_some_and(|status| status.eq_ignore_ascii_case("CANCELLED"));

    let name_key = normalize(&display_name, source.convention, source.key_policy);
    log::trace!("row {row_num}: {display_name:?} -> {name_key:?}");

    Ok(IndexedRecord {
        name_key,
        display_name,
        date,
        date_text,
        cancelled,
        record,
    })
}
