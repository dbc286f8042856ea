// Property-based tests for name keys, the identity index and date windows.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use ptreport_recon::config::SourceConfig;
use ptreport_recon::index::build_index;
use ptreport_recon::model::{RowIssue, RowRecord};
use ptreport_recon::normalize::{normalize, Charset, KeyPolicy, NameConvention, SeparatorPolicy};
use ptreport_recon::temporal::{within_horizon, MATCHED_HORIZON_DAYS, UNLINKED_HORIZON_DAYS};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Names with the punctuation and spacing the exports actually contain.
fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"[A-Za-z]{1,8}, ?[A-Za-z]{1,8}( [A-Z]\.?)?",
        1 => r"[A-Za-zéñÖ .,]{0,20}",
        1 => r"[\x{20}-\x{7e}\x{a0}-\x{17f}]{0,20}",
    ]
}

fn arb_policy() -> impl Strategy<Value = KeyPolicy> {
    (
        prop_oneof![Just(SeparatorPolicy::Strip), Just(SeparatorPolicy::SingleSpace)],
        prop_oneof![Just(Charset::Ascii), Just(Charset::Latin1)],
    )
        .prop_map(|(s, c)| KeyPolicy::new(s, c))
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..1500).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap() + Days::new(offset)
    })
}

fn schedule_rows(rows: &[(String, NaiveDate)]) -> Vec<RowRecord> {
    let headers: Arc<[String]> = Arc::from(vec![
        "PATIENT NAME".to_string(),
        "APPOINTMENT DATE".to_string(),
        "VISIT STATUS".to_string(),
    ]);
    rows.iter()
        .enumerate()
        .map(|(i, (name, date))| {
            RowRecord::new(
                i + 2,
                Arc::clone(&headers),
                vec![name.clone(), date.format("%m/%d/%Y").to_string(), "Scheduled".into()],
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Name keys
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn last_comma_first_key_is_idempotent(raw in arb_name(), policy in arb_policy()) {
        let once = normalize(&raw, NameConvention::LastCommaFirst, policy);
        let twice = normalize(&once, NameConvention::LastCommaFirst, policy);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn stripped_key_has_no_separators(
        raw in arb_name(),
        convention in prop_oneof![Just(NameConvention::LastCommaFirst), Just(NameConvention::FirstLastNoMiddle)],
    ) {
        let key = normalize(&raw, convention, KeyPolicy::new(SeparatorPolicy::Strip, Charset::Latin1));
        prop_assert!(!key.chars().any(|c| c.is_whitespace() || c == ',' || c == '.'));
        prop_assert!(key.chars().all(|c| (c as u32) <= 0xFF));
    }

    #[test]
    fn ascii_key_is_ascii(raw in arb_name(), separators in prop_oneof![Just(SeparatorPolicy::Strip), Just(SeparatorPolicy::SingleSpace)]) {
        let key = normalize(&raw, NameConvention::LastCommaFirst, KeyPolicy::new(separators, Charset::Ascii));
        prop_assert!(key.is_ascii());
        prop_assert!(!key.starts_with(' ') && !key.ends_with(' ') && !key.contains("  "));
    }
}

// ---------------------------------------------------------------------------
// Identity index
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn index_keeps_first_of_each_pair(
        rows in prop::collection::vec(
            (prop_oneof![Just("Doe, John"), Just("DOE , JOHN"), Just("Roe, Jane"), Just("Poe, Ed")], 0u64..6),
            0..40,
        )
    ) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<(String, NaiveDate)> = rows
            .into_iter()
            .map(|(n, d)| (n.to_string(), base + Days::new(d)))
            .collect();
        let source = SourceConfig::schedule();
        let build = build_index("schedule", schedule_rows(&rows), &source);

        let mut seen = BTreeSet::new();
        let mut expected_dupes = 0;
        for (i, (name, date)) in rows.iter().enumerate() {
            let key = normalize(name, source.convention, source.key_policy);
            if seen.insert((key.clone(), *date)) {
                let dates = build.index.get(&key).unwrap();
                let kept = dates.values().find(|e| e.date.date() == Some(*date)).unwrap();
                prop_assert_eq!(kept.row_num(), i + 2);
            } else {
                expected_dupes += 1;
            }
        }

        prop_assert_eq!(build.index.record_count(), seen.len());
        prop_assert_eq!(build.issues.len(), expected_dupes);
        prop_assert!(build.issues.iter().all(|i| matches!(i, RowIssue::Duplicate { .. })), "all issues should be duplicates");
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn horizon_is_inclusive_upper_bound(date in arb_date(), reference in arb_date()) {
        for horizon in [UNLINKED_HORIZON_DAYS, MATCHED_HORIZON_DAYS] {
            let limit = reference + Days::new(u64::from(horizon));
            prop_assert_eq!(within_horizon(date, reference, horizon), date <= limit);
        }
    }
}
