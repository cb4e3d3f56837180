//! Reporting utilities: per-region dataset stats and formatted terminal output.

pub mod format;

pub use format::*;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::SmoothedRecord;

/// Summary of one region's joined daily data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub region: String,
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub cumulative_cases: i64,
    pub cumulative_deaths: i64,
    /// Most recent defined 7-day average.
    pub latest_avg7: Option<f64>,
    /// Days with a negative daily case count (source corrections).
    pub negative_days: usize,
}

/// Stats for each region in `regions` that has data, in the given order.
pub fn region_stats(records: &[SmoothedRecord], regions: &[String]) -> Vec<RegionStats> {
    let mut out = Vec::new();
    for region in regions {
        let rows: Vec<&SmoothedRecord> = records.iter().filter(|r| r.region() == region).collect();
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            continue;
        };
        out.push(RegionStats {
            region: region.clone(),
            rows: rows.len(),
            first_date: first.date(),
            last_date: last.date(),
            cumulative_cases: last.daily.record.cumulative_cases,
            cumulative_deaths: last.daily.record.cumulative_deaths,
            latest_avg7: rows.iter().rev().find_map(|r| r.daily_cases_avg7),
            negative_days: rows.iter().filter(|r| r.daily.daily_cases < 0).count(),
        });
    }
    out
}
