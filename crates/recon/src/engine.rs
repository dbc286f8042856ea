use chrono::NaiveDate;

use crate::config::{ReportConfig, SourceConfig};
use crate::index::{build_index, IndexBuild};
use crate::ingest::SourceTable;
use crate::matcher::{join_prescriptions, reconcile};
use crate::model::{ReconResult, ReconSummary};
use crate::temporal::lapsed_without_followup;

fn index_table(table: SourceTable, source: &SourceConfig) -> IndexBuild {
    build_index(&table.source_name, table.rows, source)
}

/// Schedule visits with no lead coverage, plus schedule patients that could
/// not be linked to the lead export.
pub fn run_visit_report(
    config: &ReportConfig,
    schedule: SourceTable,
    lead: SourceTable,
    reference: NaiveDate,
) -> ReconResult {
    let primary = index_table(schedule, &config.schedule);
    let secondary = index_table(lead, &config.lead);

    let mut result = reconcile(&primary.index, &secondary.index, reference);
    result.summary.primary_rejected = primary.issues.len();
    result.summary.secondary_rejected = secondary.issues.len();
    log_summary("visits", &result.summary);
    result
}

/// Patients whose last visit is in the past and who have nothing booked.
pub fn run_followup_report(
    config: &ReportConfig,
    schedule: SourceTable,
    reference: NaiveDate,
) -> ReconResult {
    let primary = index_table(schedule, &config.followup_schedule());

    let rows = lapsed_without_followup(&primary.index, reference);
    let result = ReconResult {
        summary: ReconSummary {
            primary_names: primary.index.len(),
            rows_emitted: rows.len(),
            primary_rejected: primary.issues.len(),
            ..ReconSummary::default()
        },
        rows,
    };
    log_summary("followup", &result.summary);
    result
}

/// Visits of every prescription holder, tagged with the prescription end
/// date.
pub fn run_prescription_report(
    config: &ReportConfig,
    prescriptions: SourceTable,
    visits: SourceTable,
) -> ReconResult {
    let primary = index_table(prescriptions, &config.prescription);
    let secondary = index_table(visits, &config.visit);

    let mut result = join_prescriptions(&primary.index, &secondary.index);
    result.summary.primary_rejected = primary.issues.len();
    result.summary.secondary_rejected = secondary.issues.len();
    log_summary("expired", &result.summary);
    result
}

fn log_summary(pipeline: &str, s: &ReconSummary) {
    log::info!(
        "{pipeline}: {} name(s), {} exact, {} prefix, {} unlinked, {} row(s) emitted",
        s.primary_names,
        s.exact_links,
        s.prefix_links,
        s.unlinked_names,
        s.rows_emitted,
    );
}
