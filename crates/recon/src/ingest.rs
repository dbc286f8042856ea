//! Delimited text -> [`RowRecord`]s.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::config::{HeaderRule, SourceConfig};
use crate::error::ReconError;
use crate::model::{FieldRef, RowRecord};

/// Rows of one source plus its (uppercased) header.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub source_name: String,
    pub headers: Arc<[String]>,
    pub rows: Vec<RowRecord>,
}

impl SourceTable {
    /// Fail when a configured column cannot exist in this table.
    pub fn require(&self, field: &FieldRef) -> Result<(), ReconError> {
        let present = match field {
            FieldRef::Index(i) => *i < self.headers.len(),
            FieldRef::Name(name) => self.headers.iter().any(|h| h.eq_ignore_ascii_case(name)),
        };
        if present {
            Ok(())
        } else {
            Err(ReconError::MissingColumn {
                source_name: self.source_name.clone(),
                column: field.to_string(),
            })
        }
    }

    /// Check the columns `source` needs to build an index.
    pub fn require_columns(&self, source: &SourceConfig) -> Result<(), ReconError> {
        self.require(&source.name_column)?;
        self.require(&source.date_column)?;
        if let Some(ref status) = source.status_column {
            self.require(status)?;
        }
        Ok(())
    }
}

/// Open `path` and read it per `source`. An unreadable file is fatal.
pub fn read_source(path: &Path, source: &SourceConfig) -> Result<SourceTable, ReconError> {
    let file = File::open(path).map_err(|e| ReconError::io(path, e))?;
    let source_name = path.display().to_string();
    let table = parse_rows(&source_name, file, &source.header)?;
    table.require_columns(source)?;
    log::info!("{source_name}: read {} row(s)", table.rows.len());
    Ok(table)
}

/// Maps record offsets back to physical lines of the buffered input. The csv
/// reader drops empty lines and lets quoted fields span lines, so neither
/// the record count nor the gaps between records are visible otherwise.
struct LineCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    line: u64,
}

impl<'a> LineCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0, line: 1 }
    }

    /// For a record whose reader position is `start`, return the line its
    /// first field is on and how many empty lines separate it from the
    /// previous record.
    fn locate(&mut self, start: usize) -> (u64, usize) {
        let is_break = |b: &u8| matches!(b, b'\r' | b'\n');
        let start = start.min(self.bytes.len());
        let lo = start - self.bytes[..start].iter().rev().take_while(|b| is_break(b)).count();
        let hi = start + self.bytes[start..].iter().take_while(|b| is_break(b)).count();

        let breaks = line_breaks(&self.bytes[lo..hi]);
        let empty_lines = if lo == 0 { breaks } else { breaks.saturating_sub(1) };

        if hi > self.offset {
            self.line += self.bytes[self.offset..hi].iter().filter(|&&b| b == b'\n').count() as u64;
            self.offset = hi;
        }
        (self.line, empty_lines)
    }
}

/// Count line terminators; `\r\n` is one.
fn line_breaks(gap: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < gap.len() {
        i += if gap[i] == b'\r' && gap.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
        count += 1;
    }
    count
}

/// Parse delimited text. Fields are trimmed; invalid UTF-8 is replaced
/// rather than rejected. Row numbers are the physical line a record starts
/// on.
pub fn parse_rows<R: Read>(
    source_name: &str,
    mut input: R,
    header: &HeaderRule,
) -> Result<SourceTable, ReconError> {
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .map_err(|e| ReconError::io(source_name, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());
    let mut cursor = LineCursor::new(&bytes);

    let mut headers: Option<Arc<[String]>> = None;
    let mut rows = Vec::new();

    for (ct, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|e| ReconError::Csv {
            source_name: source_name.into(),
            message: e.to_string(),
        })?;
        let (line, empty_lines) = match record.position() {
            Some(pos) => cursor.locate(pos.byte() as usize),
            None => (ct as u64 + 1, 0),
        };
        let row_num = line as usize;

        let values: Vec<String> = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).trim().to_string())
            .collect();

        let hdr = match headers {
            Some(ref h) => Arc::clone(h),
            None => {
                match header {
                    HeaderRule::FirstRow => {
                        headers = Some(values.iter().map(|h| h.to_uppercase()).collect());
                    }
                    HeaderRule::FirstCellContains(marker) => {
                        let first = values.first().map(|v| v.to_uppercase()).unwrap_or_default();
                        if first.contains(&marker.to_uppercase()) {
                            headers = Some(values.iter().map(|h| h.to_uppercase()).collect());
                        } else {
                            log::trace!("{source_name}: skipping preamble row {row_num}");
                        }
                    }
                }
                continue;
            }
        };

        if matches!(header, HeaderRule::FirstCellContains(_))
            && (empty_lines > 0 || values.first().map_or(true, |v| v.is_empty()))
        {
            log::debug!("{source_name}: data ends before row {row_num}");
            break;
        }

        rows.push(RowRecord::new(row_num, hdr, values));
    }

    let headers = match (headers, header) {
        (Some(h), _) => h,
        (None, HeaderRule::FirstCellContains(marker)) => {
            return Err(ReconError::HeaderNotFound {
                source_name: source_name.into(),
                marker: marker.clone(),
            })
        }
        (None, HeaderRule::FirstRow) => Arc::from(Vec::new()),
    };

    Ok(SourceTable {
        source_name: source_name.into(),
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_header_uppercased_and_trimmed() {
        let csv = "\
Patient Name , Appointment Date,Visit Status
 Doe, John ,01/05/2024, Scheduled
";
        // "Doe, John" is unquoted so it splits into two fields
        let table = parse_rows("schedule", csv.as_bytes(), &HeaderRule::FirstRow).unwrap();
        assert_eq!(&*table.headers, ["PATIENT NAME", "APPOINTMENT DATE", "VISIT STATUS"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].row_num, 2);
        assert_eq!(table.rows[0].get("patient name"), Some("Doe"));
    }

    #[test]
    fn quoted_names_and_short_rows() {
        let csv = "\
PATIENT NAME,APPOINTMENT DATE,VISIT STATUS
\"Doe, John\",01/05/2024,Scheduled
\"Roe, Jane\",01/06/2024
";
        let table = parse_rows("schedule", csv.as_bytes(), &HeaderRule::FirstRow).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("PATIENT NAME"), Some("Doe, John"));
        assert_eq!(table.rows[1].row_num, 3);
        assert_eq!(table.rows[1].get("VISIT STATUS"), None);
        assert_eq!(table.rows[1].text("VISIT STATUS"), "");
    }

    #[test]
    fn marker_header_skips_preamble_and_stops_at_blank() {
        let csv = "\
Prescription Export,,
Generated 2024-02-01,,
Patient Name,Clinic,Rx End
\"Smith , Ann\",Main,2024-01-31
\"Bende, Ola\",Main,0000-00-00
,,
\"Late, Row\",Main,2024-05-01
";
        let table = parse_rows(
            "prescription",
            csv.as_bytes(),
            &HeaderRule::FirstCellContains("PATIENT NAME".into()),
        )
        .unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].field(&FieldRef::Index(2)), Some("2024-01-31"));
        assert_eq!(table.rows[0].row_num, 4);
        assert_eq!(table.rows[1].field(&FieldRef::Index(0)), Some("Bende, Ola"));
    }

    #[test]
    fn row_numbers_follow_physical_lines() {
        let csv = "\
PATIENT NAME,APPOINTMENT DATE
\"Doe, John\",01/05/2024

\"Roe,
Jane\",01/06/2024
\"Poe, Ed\",01/07/2024
";
        let table = parse_rows("schedule", csv.as_bytes(), &HeaderRule::FirstRow).unwrap();
        let nums: Vec<usize> = table.rows.iter().map(|r| r.row_num).collect();
        assert_eq!(nums, vec![2, 4, 6]);
        assert_eq!(table.rows[1].get("PATIENT NAME"), Some("Roe,\nJane"));
    }

    #[test]
    fn marker_data_ends_at_empty_line() {
        let csv = "\
Report
PATIENT NAME,CLINIC,END
\"Smith, Ann\",Main,2024-01-31
\"Lee,
Bo\",Main,2024-01-15
\"Wu, Li\",Main,2024-01-20

Totals: 3,,2024-02-01
";
        let table = parse_rows(
            "prescription",
            csv.as_bytes(),
            &HeaderRule::FirstCellContains("PATIENT NAME".into()),
        )
        .unwrap();
        let names: Vec<&str> = table.rows.iter().map(|r| r.text("PATIENT NAME")).collect();
        assert_eq!(names, vec!["Smith, Ann", "Lee,\nBo", "Wu, Li"]);
        let nums: Vec<usize> = table.rows.iter().map(|r| r.row_num).collect();
        assert_eq!(nums, vec![3, 4, 6]);
    }

    #[test]
    fn empty_lines_in_preamble_are_skipped() {
        let csv = "Report\n\nPATIENT NAME,CLINIC,END\n\"Smith, Ann\",Main,2024-01-31\n";
        let table = parse_rows(
            "prescription",
            csv.as_bytes(),
            &HeaderRule::FirstCellContains("PATIENT NAME".into()),
        )
        .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].row_num, 4);
    }

    #[test]
    fn marker_never_found() {
        let err = parse_rows(
            "prescription",
            "a,b\nc,d\n".as_bytes(),
            &HeaderRule::FirstCellContains("PATIENT NAME".into()),
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::HeaderNotFound { .. }));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut bytes = b"PATIENT NAME,APPOINTMENT DATE\n\"Mu".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"ller, Jo\",01/02/2024\n");
        let table = parse_rows("schedule", bytes.as_slice(), &HeaderRule::FirstRow).unwrap();
        assert_eq!(table.rows[0].get("PATIENT NAME"), Some("Mu\u{FFFD}ller, Jo"));
    }

    #[test]
    fn require_columns_reports_missing() {
        let table = parse_rows(
            "lead",
            "PATIENT NAME,DATE\nJohn Doe,01/02/2024\n".as_bytes(),
            &HeaderRule::FirstRow,
        )
        .unwrap();
        let err = table.require_columns(&SourceConfig::lead()).unwrap_err();
        assert_eq!(err.to_string(), "lead: missing column 'APPT DATE'");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source(&dir.path().join("nope.csv"), &SourceConfig::schedule()).unwrap_err();
        assert!(matches!(err, ReconError::Io { .. }));
    }
}
