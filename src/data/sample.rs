//! Synthetic wide tables for offline runs.
//!
//! The generated tables use the same schema as the remote files: four
//! geographic columns followed by `M/D/YY` date columns holding cumulative
//! counts. Daily incidence follows two epidemic waves with a weekly reporting
//! dip and Poisson noise; deaths are a binomial fraction of daily cases.

use chrono::{Datelike, Days, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Binomial, Poisson};

use crate::domain::{Metric, RawRow, RawSeriesTable};
use crate::error::{AppError, ErrorKind, Stage};

/// Number of daily columns generated for offline runs.
pub const SAMPLE_DAYS: usize = 420;

/// Extra region split into sub-regions, so offline runs exercise the
/// sub-region collapse in the merger.
const SPLIT_REGION: (&str, [&str; 2]) = ("Australia", ["New South Wales", "Victoria"]);

/// Fraction of cases reported as deaths.
const CASE_FATALITY: f64 = 0.015;

/// Day-0 of the generated series (first column of the real dataset).
pub fn sample_start() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2020, 1, 22)
}

#[derive(Debug, Clone, Copy)]
struct WaveProfile {
    peak_1: f64,
    center_1: f64,
    width_1: f64,
    peak_2: f64,
    center_2: f64,
    width_2: f64,
}

impl WaveProfile {
    fn from_rng(rng: &mut StdRng, days: usize) -> Self {
        let days = days.max(1) as f64;
        Self {
            peak_1: rng.gen_range(500.0..5_000.0),
            center_1: days * rng.gen_range(0.2..0.35),
            width_1: days * rng.gen_range(0.05..0.10),
            peak_2: rng.gen_range(2_000.0..20_000.0),
            center_2: days * rng.gen_range(0.6..0.8),
            width_2: days * rng.gen_range(0.06..0.12),
        }
    }

    fn intensity(&self, t: usize) -> f64 {
        let t = t as f64;
        let bump = |peak: f64, center: f64, width: f64| {
            let z = (t - center) / width;
            peak * (-0.5 * z * z).exp()
        };
        bump(self.peak_1, self.center_1, self.width_1) + bump(self.peak_2, self.center_2, self.width_2)
    }
}

/// Generate a (cases, deaths) pair of wide tables for `regions`.
pub fn sample_tables(
    regions: &[String],
    seed: u64,
    days: usize,
) -> Result<(RawSeriesTable, RawSeriesTable), AppError> {
    if days == 0 {
        return Err(AppError::config("Sample day count must be > 0."));
    }
    let start = sample_start().ok_or_else(|| AppError::config("Invalid sample start date."))?;

    let mut date_headers = Vec::with_capacity(days);
    for i in 0..days {
        let date = start
            .checked_add_days(Days::new(i as u64))
            .ok_or_else(|| AppError::config("Sample date range overflows the calendar."))?;
        date_headers.push(format_header_date(date));
    }

    let mut rows: Vec<(Option<String>, String)> = regions.iter().map(|r| (None, r.clone())).collect();
    let (split_region, provinces) = SPLIT_REGION;
    if !regions.iter().any(|r| r == split_region) {
        for province in provinces {
            rows.push((Some(province.to_string()), split_region.to_string()));
        }
    }

    let mut cases_rows = Vec::with_capacity(rows.len());
    let mut deaths_rows = Vec::with_capacity(rows.len());

    for (province, region) in rows {
        let mut rng = StdRng::seed_from_u64(row_seed(seed, &region, province.as_deref()));
        let profile = WaveProfile::from_rng(&mut rng, days);
        let (cases, deaths) = simulate_cumulative(&mut rng, &profile, days)?;

        cases_rows.push(RawRow {
            province: province.clone(),
            region: region.clone(),
            lat: None,
            long: None,
            cells: cases.iter().map(|v| v.to_string()).collect(),
        });
        deaths_rows.push(RawRow {
            province,
            region,
            lat: None,
            long: None,
            cells: deaths.iter().map(|v| v.to_string()).collect(),
        });
    }

    tracing::info!(rows = cases_rows.len(), days, seed, "generated offline sample tables");

    Ok((
        RawSeriesTable {
            metric: Metric::Cases,
            date_headers: date_headers.clone(),
            rows: cases_rows,
        },
        RawSeriesTable {
            metric: Metric::Deaths,
            date_headers,
            rows: deaths_rows,
        },
    ))
}

fn simulate_cumulative(
    rng: &mut StdRng,
    profile: &WaveProfile,
    days: usize,
) -> Result<(Vec<i64>, Vec<i64>), AppError> {
    let mut cases = Vec::with_capacity(days);
    let mut deaths = Vec::with_capacity(days);
    let (mut cum_cases, mut cum_deaths) = (0i64, 0i64);

    for t in 0..days {
        // Weekend reporting dip.
        let weekday_factor = if t % 7 >= 5 { 0.7 } else { 1.0 };
        let lambda = (profile.intensity(t) * weekday_factor).max(0.5);

        let poisson = Poisson::new(lambda)
            .map_err(|e| AppError::new(ErrorKind::Config, Stage::Load, format!("Noise distribution error: {e}")))?;
        let new_cases = poisson.sample(rng).round() as u64;

        let binomial = Binomial::new(new_cases, CASE_FATALITY)
            .map_err(|e| AppError::new(ErrorKind::Config, Stage::Load, format!("Noise distribution error: {e}")))?;
        let new_deaths = binomial.sample(rng);

        cum_cases += new_cases as i64;
        cum_deaths += new_deaths as i64;
        cases.push(cum_cases);
        deaths.push(cum_deaths);
    }

    Ok((cases, deaths))
}

/// Format a date as the dataset's `M/D/YY` header.
pub fn format_header_date(date: NaiveDate) -> String {
    format!("{}/{}/{:02}", date.month(), date.day(), date.year().rem_euclid(100))
}

/// Per-row seed: FNV-1a over the seed and names, then a splitmix64 finalizer.
///
/// Fixed arithmetic so `--offline --seed N` gives the same tables on every build.
fn row_seed(seed: u64, region: &str, province: Option<&str>) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let fold = |h: u64, bytes: &[u8]| {
        bytes
            .iter()
            .fold(h, |h, b| (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
    };

    let mut h = fold(FNV_OFFSET, &seed.to_le_bytes());
    h = fold(h, region.as_bytes());
    h = fold(h, &[0xff]);
    h = match province {
        None => fold(h, &[0x00]),
        Some(p) => fold(fold(fold(h, &[0x01]), p.as_bytes()), &[0xff]),
    };

    let mut z = h.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_seeds_are_fixed_values() {
        assert_eq!(row_seed(42, "US", None), 0xd71a_347b_9fff_0557);
        assert_eq!(row_seed(42, "Australia", Some("Victoria")), 0x60af_c061_6f0b_1758);
        assert_ne!(row_seed(42, "US", None), row_seed(43, "US", None));
        assert_ne!(row_seed(1, "Australia", None), row_seed(1, "Australia", Some("")));
    }

    fn regions() -> Vec<String> {
        vec!["US".to_string(), "India".to_string()]
    }

    #[test]
    fn header_dates_use_month_day_two_digit_year() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 7).unwrap();
        assert_eq!(format_header_date(date), "3/7/21");
    }

    #[test]
    fn tables_have_configured_regions_and_split_region() {
        let (cases, deaths) = sample_tables(&regions(), 7, 30).unwrap();
        assert_eq!(cases.date_headers.len(), 30);
        assert_eq!(cases.date_headers[0], "1/22/20");
        assert_eq!(cases.rows.len(), 4);
        assert_eq!(deaths.rows.len(), 4);
        assert_eq!(cases.rows[0].region, "US");
        assert_eq!(cases.rows[2].region, "Australia");
        assert_eq!(cases.rows[2].province.as_deref(), Some("New South Wales"));
    }

    #[test]
    fn cumulative_counts_never_decrease_and_deaths_stay_below_cases() {
        let (cases, deaths) = sample_tables(&regions(), 11, 120).unwrap();
        for (c_row, d_row) in cases.rows.iter().zip(deaths.rows.iter()) {
            let c: Vec<i64> = c_row.cells.iter().map(|s| s.parse().unwrap()).collect();
            let d: Vec<i64> = d_row.cells.iter().map(|s| s.parse().unwrap()).collect();
            assert!(c.windows(2).all(|w| w[1] >= w[0]));
            assert!(d.windows(2).all(|w| w[1] >= w[0]));
            assert!(c.iter().zip(d.iter()).all(|(c, d)| d <= c));
        }
    }

    #[test]
    fn same_seed_reproduces_tables() {
        let (a, _) = sample_tables(&regions(), 3, 50).unwrap();
        let (b, _) = sample_tables(&regions(), 3, 50).unwrap();
        assert_eq!(a.rows[1].cells, b.rows[1].cells);
    }
}
