//! `ptreport-recon`: patient identity reconciliation for clinic reports.
//!
//! Reads schedule, lead and prescription exports, indexes them by
//! normalized patient name and appointment date, links identities across
//! sources and filters visits by date window. The reference date is
//! always passed in; nothing here reads the clock.

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod temporal;

pub use config::{ReportConfig, SourceConfig};
pub use engine::{run_followup_report, run_prescription_report, run_visit_report};
pub use error::ReconError;
pub use ingest::{read_source, SourceTable};
pub use model::{OutputRow, ReconResult, ReconSummary};
pub use report::{write_report, ReportLayout};
