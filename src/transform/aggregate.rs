//! Region filtering and first-differencing of cumulative counts.
//!
//! `daily[i] = cumulative[i] - cumulative[i-1]` with `cumulative[-1] = 0`, so
//! a region's first daily value is its full cumulative count on that date.
//! Differences are taken within one region's date-ordered sequence only.

use chrono::NaiveDate;

use crate::domain::{DailyRecord, JoinedRecord, SmoothedRecord};
use crate::error::{AppError, ErrorKind, Stage};

/// Filter to `regions` and derive daily counts.
///
/// Output is grouped by region in allow-list order, dates ascending.
pub fn daily_counts(joined: &[JoinedRecord], regions: &[String]) -> Vec<DailyRecord> {
    let mut out = Vec::new();

    for region in regions {
        let mut records: Vec<&JoinedRecord> = joined.iter().filter(|r| &r.region == region).collect();
        if records.is_empty() {
            tracing::warn!(%region, "region not present in joined data");
            continue;
        }
        records.sort_by_key(|r| r.date);

        let (mut prev_cases, mut prev_deaths) = (0i64, 0i64);
        for r in records {
            out.push(DailyRecord {
                record: r.clone(),
                daily_cases: r.cumulative_cases - prev_cases,
                daily_deaths: r.cumulative_deaths - prev_deaths,
            });
            prev_cases = r.cumulative_cases;
            prev_deaths = r.cumulative_deaths;
        }
    }

    tracing::info!(records = out.len(), regions = regions.len(), "derived daily counts");
    out
}

/// One region's daily-case sequence, ready for forecasting.
///
/// Requires one sample per calendar day; a gap is a fit error.
pub fn daily_case_series(
    records: &[SmoothedRecord],
    region: &str,
) -> Result<(Vec<NaiveDate>, Vec<f64>), AppError> {
    let rows: Vec<&SmoothedRecord> = records.iter().filter(|r| r.region() == region).collect();
    if rows.is_empty() {
        return Err(AppError::new(
            ErrorKind::Join,
            Stage::Aggregate,
            format!("No joined rows for forecast region '{region}'."),
        ));
    }

    for pair in rows.windows(2) {
        let gap = (pair[1].date() - pair[0].date()).num_days();
        if gap != 1 {
            return Err(AppError::model_fit(format!(
                "Daily series for '{region}' is not contiguous between {} and {}.",
                pair[0].date(),
                pair[1].date()
            )));
        }
    }

    let dates = rows.iter().map(|r| r.date()).collect();
    let values = rows.iter().map(|r| r.daily.daily_cases as f64).collect();
    Ok((dates, values))
}
