//! Trailing moving average of daily cases.
//!
//! The window is right-aligned: the value at position `i` averages positions
//! `i-window+1 ..= i` of the same region. Positions with fewer than `window`
//! samples get `None`.

use std::collections::HashMap;

use crate::domain::{DailyRecord, SmoothedRecord};
use crate::error::{AppError, ErrorKind, Stage};

/// Smooth each region's daily cases independently.
///
/// Input order is preserved. Within a region, records are expected in
/// ascending date order (as produced by the aggregator).
pub fn smooth_daily_cases(records: &[DailyRecord], window: usize) -> Result<Vec<SmoothedRecord>, AppError> {
    if window == 0 {
        return Err(AppError::new(
            ErrorKind::Config,
            Stage::Smooth,
            "Moving-average window must be >= 1.",
        ));
    }

    // Positions of each region's records, in input order.
    let mut by_region: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, r) in records.iter().enumerate() {
        by_region.entry(r.record.region.as_str()).or_default().push(idx);
    }

    let mut averages: Vec<Option<f64>> = vec![None; records.len()];
    for positions in by_region.values() {
        let values: Vec<i64> = positions.iter().map(|&i| records[i].daily_cases).collect();
        for (k, avg) in trailing_mean(&values, window).into_iter().enumerate() {
            averages[positions[k]] = avg;
        }
    }

    Ok(records
        .iter()
        .cloned()
        .zip(averages)
        .map(|(daily, daily_cases_avg7)| SmoothedRecord { daily, daily_cases_avg7 })
        .collect())
}

/// Right-aligned trailing mean; `None` until `window` samples are available.
pub fn trailing_mean(values: &[i64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0i64;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum as f64 / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}
