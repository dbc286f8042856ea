use chrono::NaiveDate;

use crate::index::{DateMap, IdentityIndex};
use crate::model::{DateKey, OutputRow, ReconResult, ReconSummary};
use crate::temporal::{filter_matched, filter_unlinked, MATCHED_HORIZON_DAYS, UNLINKED_HORIZON_DAYS};

/// How a primary name was tied to the secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link<'a> {
    /// Same key on both sides.
    Exact(&'a str),
    /// The only secondary key that is a leading substring of the primary key.
    Prefix(&'a str),
    /// Zero or several prefix candidates; never guessed.
    Unlinked { candidates: usize },
}

/// Resolve `name` against `secondary`. An exact key always wins, even when
/// prefix candidates exist too.
pub fn link_identity<'a>(name: &str, secondary: &'a IdentityIndex) -> Link<'a> {
    if let Some(key) = secondary.key(name) {
        return Link::Exact(key);
    }

    let candidates: Vec<&'a str> = secondary.names().filter(|k| name.starts_with(*k)).collect();
    match candidates.as_slice() {
        [only] => Link::Prefix(*only),
        _ => Link::Unlinked {
            candidates: candidates.len(),
        },
    }
}

/// Cross-source pass: every primary name, in key order, is linked and its
/// visits run through the matching window rule.
pub fn reconcile(
    primary: &IdentityIndex,
    secondary: &IdentityIndex,
    reference: NaiveDate,
) -> ReconResult {
    let mut rows = Vec::new();
    let mut summary = ReconSummary {
        primary_names: primary.len(),
        ..ReconSummary::default()
    };

    for (name, primary_dates) in primary.iter() {
        match link_identity(name, secondary) {
            Link::Exact(key) => {
                log::debug!("{name}: exact name match");
                summary.exact_links += 1;
                rows.extend(matched_rows(primary_dates, secondary, key, reference));
            }
            Link::Prefix(key) => {
                log::debug!("{name}: leading match on {key}");
                summary.prefix_links += 1;
                rows.extend(matched_rows(primary_dates, secondary, key, reference));
            }
            Link::Unlinked { candidates } => {
                log::debug!("{name}: {candidates} matches");
                summary.unlinked_names += 1;
                let flagged =
                    filter_unlinked(primary_dates, candidates, reference, UNLINKED_HORIZON_DAYS);
                if !flagged.is_empty() {
                    log::warn!(
                        "{name}: {candidates} lead candidates, {} visit(s) flagged",
                        flagged.len()
                    );
                }
                rows.extend(flagged);
            }
        }
    }

    summary.rows_emitted = rows.len();
    ReconResult { rows, summary }
}

fn matched_rows(
    primary_dates: &DateMap,
    secondary: &IdentityIndex,
    key: &str,
    reference: NaiveDate,
) -> Vec<OutputRow> {
    match secondary.get(key) {
        Some(secondary_dates) => {
            filter_matched(primary_dates, secondary_dates, reference, MATCHED_HORIZON_DAYS)
        }
        None => Vec::new(),
    }
}

/// Latest real end date; the sentinel only when nothing else is known.
fn latest_end_date(dates: &DateMap) -> Option<DateKey> {
    dates.keys().next_back().copied()
}

/// Prescription holders joined to their visits by exact key. Each matched
/// holder emits every visit, ascending by date, tagged with the end date.
pub fn join_prescriptions(prescriptions: &IdentityIndex, visits: &IdentityIndex) -> ReconResult {
    let mut rows = Vec::new();
    let mut summary = ReconSummary {
        primary_names: prescriptions.len(),
        ..ReconSummary::default()
    };

    for (name, rx_dates) in prescriptions.iter() {
        let Some(visit_dates) = visits.get(name) else {
            log::debug!("{name}: no visits for prescription holder");
            summary.unlinked_names += 1;
            continue;
        };
        summary.exact_links += 1;
        let end_date = latest_end_date(rx_dates);
        rows.extend(visit_dates.values().map(|visit| OutputRow {
            rx_end_date: end_date,
            ..OutputRow::plain(visit)
        }));
    }

    summary.rows_emitted = rows.len();
    ReconResult { rows, summary }
}
