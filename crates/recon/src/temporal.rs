//! Appointment window rules. Pure functions of their inputs and the
//! reference date; no IO.

use chrono::{Days, NaiveDate};

use crate::index::{DateMap, IdentityIndex};
use crate::model::{IndexedRecord, OutputRow};

/// Look-ahead for a linked patient whose visit has no lead entry.
pub const MATCHED_HORIZON_DAYS: u32 = 14;

/// Look-ahead for a patient that could not be linked at all.
pub const UNLINKED_HORIZON_DAYS: u32 = 7;

/// True when `date` is on or before `reference + horizon_days`. Past dates
/// are always within the window.
pub fn within_horizon(date: NaiveDate, reference: NaiveDate, horizon_days: u32) -> bool {
    reference
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .map_or(true, |limit| date <= limit)
}

/// A non-cancelled record with a real date inside the window.
fn eligible(entry: &IndexedRecord, reference: NaiveDate, horizon_days: u32) -> bool {
    if entry.cancelled {
        return false;
    }
    match entry.date.date() {
        Some(date) => within_horizon(date, reference, horizon_days),
        None => {
            log::debug!("row {}: no date, outside every window", entry.row_num());
            false
        }
    }
}

/// Visits of a linked patient whose date has no counterpart in the
/// secondary source. Dates present on both sides are reconciled and emit
/// nothing.
pub fn filter_matched(
    primary_dates: &DateMap,
    secondary_dates: &DateMap,
    reference: NaiveDate,
    horizon_days: u32,
) -> Vec<OutputRow> {
    primary_dates
        .iter()
        .filter(|(date, _)| !secondary_dates.contains_key(*date))
        .filter(|(_, entry)| eligible(entry, reference, horizon_days))
        .map(|(date, entry)| {
            OutputRow::flagged(entry, format!("Patient matched but this date did not {date}"))
        })
        .collect()
}

/// Every eligible visit of a patient that could not be linked, citing how
/// many link candidates were found.
pub fn filter_unlinked(
    primary_dates: &DateMap,
    candidates: usize,
    reference: NaiveDate,
    horizon_days: u32,
) -> Vec<OutputRow> {
    primary_dates
        .values()
        .filter(|entry| eligible(entry, reference, horizon_days))
        .map(|entry| OutputRow::flagged(entry, format!("ERROR: {candidates} found in LeadSheet")))
        .collect()
}

/// Patients whose visits all lie before `reference`: emit the most recent
/// one. Anyone with a visit today or later is covered. Ordered by patient
/// name as typed, then date.
pub fn lapsed_without_followup(index: &IdentityIndex, reference: NaiveDate) -> Vec<OutputRow> {
    let mut rows: Vec<OutputRow> = index
        .iter()
        .filter_map(|(name, dates)| {
            let has_upcoming = dates
                .keys()
                .filter_map(|d| d.date())
                .any(|d| d >= reference);
            if has_upcoming {
                log::trace!("{name}: has an upcoming visit");
                return None;
            }
            dates
                .values()
                .rev()
                .find(|entry| entry.date.date().is_some_and(|d| d < reference))
                .map(OutputRow::plain)
        })
        .collect();

    rows.sort_by(|a, b| {
        a.entry
            .display_name
            .cmp(&b.entry.display_name)
            .then(a.entry.date.cmp(&b.entry.date))
    });
    rows
}
