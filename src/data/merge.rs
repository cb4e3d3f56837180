//! Inner join of the cases and deaths tidy tables.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{JoinedRecord, TidyRecord};

/// Sum records sharing `(region, date)`.
///
/// Countries reported per province contribute one tidy record per province;
/// collapsing them keeps the joined table unique per `(region, date)`.
pub fn collapse_regions(records: &[TidyRecord]) -> BTreeMap<(String, NaiveDate), i64> {
    let mut out: BTreeMap<(String, NaiveDate), i64> = BTreeMap::new();
    for r in records {
        *out.entry((r.region.clone(), r.date)).or_insert(0) += r.value;
    }
    out
}

/// Join cases with deaths on exact `(region, date)`.
///
/// Keys present on only one side are dropped. The result is sorted by region,
/// then date. An empty result is returned as-is.
pub fn join(cases: &[TidyRecord], deaths: &[TidyRecord]) -> Vec<JoinedRecord> {
    let cases = collapse_regions(cases);
    let deaths = collapse_regions(deaths);

    let joined: Vec<JoinedRecord> = cases
        .into_iter()
        .filter_map(|((region, date), cumulative_cases)| {
            let cumulative_deaths = *deaths.get(&(region.clone(), date))?;
            Some(JoinedRecord {
                region,
                date,
                cumulative_cases,
                cumulative_deaths,
            })
        })
        .collect();

    if joined.is_empty() {
        tracing::warn!("cases and deaths tables share no (region, date) rows");
    } else {
        tracing::info!(records = joined.len(), "joined cases and deaths");
    }

    joined
}
