//! Fixed-column report tables. Column order is a downstream contract.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::ReconError;
use crate::model::OutputRow;

const CASE_TITLE: &str = "CASE TITLE";
const TREATING_THERAPIST: &str = "TREATING THERAPIST";
const CASE_THERAPIST: &str = "CASE THERAPIST";
const APPOINTMENT_TYPE: &str = "APPOINTMENT TYPE";
const CLINIC_NAME: &str = "CLINIC NAME";
const VISIT_STATUS: &str = "VISIT STATUS";
const START_TIME: &str = "START TIME";
const END_TIME: &str = "END TIME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// Visits lacking lead coverage, with row number and comment.
    Visits,
    /// Lapsed patients without a booked follow-up.
    Followup,
    /// Prescription holders and their visits.
    Prescription,
}

impl ReportLayout {
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Self::Visits => &[
                "Patient Name",
                "Case Title",
                "Treating Therapist",
                "Case Therapist",
                "Appointment Type",
                "Appointment Date",
                "ROW NUMBER",
                "COMMENT",
            ],
            Self::Followup => &[
                "Patient Name",
                "Case Title",
                "Treating Therapist",
                "Case Therapist",
                "Appointment Type",
                "Appointment Date",
            ],
            Self::Prescription => &[
                "Patient Name",
                "Rx End Date",
                "Clinic",
                "Case Title",
                "Treating Therapist",
                "Case Therapist",
                "Appointment Type",
                "Appointment Date",
                "Visit Status",
                "Start Time",
                "End Time",
            ],
        }
    }

    fn file_stem(&self) -> &'static str {
        match self {
            Self::Visits => "output",
            Self::Followup => "followup",
            Self::Prescription => "expired_prescription",
        }
    }

    /// Report file name for a run on `date`, e.g. `output_20240220.csv`.
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.csv", self.file_stem(), date.format("%Y%m%d"))
    }

    /// One output line, in header order.
    pub fn project(&self, row: &OutputRow) -> Vec<String> {
        let entry = &row.entry;
        let rec = &entry.record;
        match self {
            Self::Visits => vec![
                entry.display_name.clone(),
                rec.text(CASE_TITLE).into(),
                rec.text(TREATING_THERAPIST).into(),
                rec.text(CASE_THERAPIST).into(),
                rec.text(APPOINTMENT_TYPE).into(),
                entry.date_text.clone(),
                entry.row_num().to_string(),
                row.comment.clone().unwrap_or_default(),
            ],
            Self::Followup => vec![
                entry.display_name.clone(),
                rec.text(CASE_TITLE).into(),
                rec.text(TREATING_THERAPIST).into(),
                rec.text(CASE_THERAPIST).into(),
                rec.text(APPOINTMENT_TYPE).into(),
                entry.date_text.clone(),
            ],
            Self::Prescription => vec![
                entry.display_name.clone(),
                row.rx_end_date.map(|d| d.to_string()).unwrap_or_default(),
                rec.text(CLINIC_NAME).into(),
                rec.text(CASE_TITLE).into(),
                rec.text(TREATING_THERAPIST).into(),
                rec.text(CASE_THERAPIST).into(),
                rec.text(APPOINTMENT_TYPE).into(),
                entry.date_text.clone(),
                rec.text(VISIT_STATUS).into(),
                rec.text(START_TIME).into(),
                rec.text(END_TIME).into(),
            ],
        }
    }
}

/// Render the header and every row to CSV bytes.
pub fn render_report(layout: ReportLayout, rows: &[OutputRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(layout.headers())?;
    for row in rows {
        writer.write_record(layout.project(row))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Write the dated report into `dir`, returning its path. Nothing is
/// written unless the whole table rendered.
pub fn write_report(
    dir: &Path,
    layout: ReportLayout,
    run_date: NaiveDate,
    rows: &[OutputRow],
) -> Result<PathBuf, ReconError> {
    let path = dir.join(layout.file_name(run_date));
    let bytes = render_report(layout, rows).map_err(|e| ReconError::Csv {
        source_name: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(&path, bytes).map_err(|e| ReconError::io(&path, e))?;
    log::info!("wrote {} row(s) to {}", rows.len(), path.display());
    Ok(path)
}
