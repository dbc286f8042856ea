//! `ptreport visits|followup|expired`: load, reconcile, write the dated report.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use ptreport_recon::config::{ReportConfig, SourceConfig};
use ptreport_recon::report::{write_report, ReportLayout};
use ptreport_recon::{
    read_source, run_followup_report, run_prescription_report, run_visit_report, ReconResult,
    SourceTable,
};

use crate::CliError;

/// Flags shared by every subcommand.
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
}

impl RunOptions {
    fn load_config(&self) -> Result<ReportConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => {
                let config = ReportConfig::load(path).map_err(CliError::config)?;
                log::info!("loaded config from {}", path.display());
                config
            }
            None => ReportConfig::default(),
        };
        if let Some(dir) = &self.out_dir {
            config.output_dir = dir.clone();
        }
        Ok(config)
    }
}

/// The reporting day. Everything downstream takes it as a parameter.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn read_input(path: &Path, source: &SourceConfig) -> Result<SourceTable, CliError> {
    read_source(path, source).map_err(CliError::input)
}

fn finish(
    config: &ReportConfig,
    layout: ReportLayout,
    run_date: NaiveDate,
    result: &ReconResult,
) -> Result<(), CliError> {
    let path = write_report(&config.output_dir, layout, run_date, &result.rows).map_err(|e| {
        CliError::output(e).with_hint(format!(
            "check that {} exists and is writable",
            config.output_dir.display()
        ))
    })?;

    let s = &result.summary;
    eprintln!("wrote {}", path.display());
    eprintln!(
        "{} row(s) from {} patient(s): {} exact, {} prefix, {} unlinked; rejected {} + {} input row(s)",
        s.rows_emitted,
        s.primary_names,
        s.exact_links,
        s.prefix_links,
        s.unlinked_names,
        s.primary_rejected,
        s.secondary_rejected,
    );
    Ok(())
}

pub fn cmd_visits(opts: &RunOptions, schedule: PathBuf, lead: PathBuf) -> Result<(), CliError> {
    let config = opts.load_config()?;
    let reference = today();
    let schedule = read_input(&schedule, &config.schedule)?;
    let lead = read_input(&lead, &config.lead)?;

    let result = run_visit_report(&config, schedule, lead, reference);
    finish(&config, ReportLayout::Visits, reference, &result)
}

pub fn cmd_followup(opts: &RunOptions, schedule: PathBuf) -> Result<(), CliError> {
    let config = opts.load_config()?;
    let reference = today();
    let schedule = read_input(&schedule, &config.followup_schedule())?;

    let result = run_followup_report(&config, schedule, reference);
    finish(&config, ReportLayout::Followup, reference, &result)
}

pub fn cmd_expired(
    opts: &RunOptions,
    prescription: PathBuf,
    visit: PathBuf,
) -> Result<(), CliError> {
    let config = opts.load_config()?;
    let prescriptions = read_input(&prescription, &config.prescription)?;
    let visits = read_input(&visit, &config.visit)?;

    let result = run_prescription_report(&config, prescriptions, visits);
    finish(&config, ReportLayout::Prescription, today(), &result)
}
