//! Wide → long reshaping.
//!
//! Latitude, longitude and sub-region are dropped; each date column of each row
//! becomes one `(region, date, value)` record. Records come out in row order,
//! and within a row in the table's column order.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::{RawSeriesTable, TidyRecord};
use crate::error::{AppError, Stage};

/// Header date format (`M/D/YY`).
pub const DATE_HEADER_FORMAT: &str = "%m/%d/%y";

/// Pivot a wide table into tidy records.
pub fn reshape(table: &RawSeriesTable) -> Result<Vec<TidyRecord>, AppError> {
    let mut dates = Vec::with_capacity(table.date_headers.len());
    let mut seen = HashSet::with_capacity(table.date_headers.len());
    for header in &table.date_headers {
        let date = parse_header_date(header)?;
        if !seen.insert(date) {
            return Err(AppError::parse(
                Stage::Reshape,
                format!("Duplicate date column '{header}' in the {} table.", table.metric.label()),
            ));
        }
        dates.push(date);
    }

    let mut out = Vec::with_capacity(table.rows.len() * dates.len());
    for row in &table.rows {
        if row.cells.len() != dates.len() {
            return Err(AppError::schema(
                Stage::Reshape,
                format!(
                    "Row for '{}' has {} cells but the table has {} date columns.",
                    row.region,
                    row.cells.len(),
                    dates.len()
                ),
            ));
        }

        for ((date, cell), header) in dates.iter().zip(&row.cells).zip(&table.date_headers) {
            let value = parse_count(cell).ok_or_else(|| {
                AppError::parse(
                    Stage::Reshape,
                    format!(
                        "Invalid {} count '{cell}' for '{}' on {header}.",
                        table.metric.label(),
                        row.region
                    ),
                )
            })?;
            out.push(TidyRecord {
                region: row.region.clone(),
                date: *date,
                value,
            });
        }
    }

    tracing::debug!(
        metric = table.metric.label(),
        records = out.len(),
        "reshaped wide table"
    );
    Ok(out)
}

/// Parse a `M/D/YY` column header.
pub fn parse_header_date(header: &str) -> Result<NaiveDate, AppError> {
    let trimmed = header.trim();
    let two_digit_year = trimmed
        .rsplit('/')
        .next()
        .is_some_and(|y| y.len() == 2 && y.bytes().all(|b| b.is_ascii_digit()));

    let parsed = if two_digit_year {
        NaiveDate::parse_from_str(trimmed, DATE_HEADER_FORMAT).ok()
    } else {
        None
    };

    parsed.ok_or_else(|| {
        AppError::parse(
            Stage::Reshape,
            format!("Invalid date column header '{trimmed}'. Expected M/D/YY."),
        )
    })
}

/// Cumulative counts are integers; integral floats (`12.0`) are accepted.
fn parse_count(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<i64>() {
        return Some(v);
    }
    let v = cell.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metric, RawRow};
    use crate::error::ErrorKind;

    fn table(headers: &[&str], rows: &[(&str, &[&str])]) -> RawSeriesTable {
        RawSeriesTable {
            metric: Metric::Cases,
            date_headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(region, cells)| RawRow {
                    province: None,
                    region: region.to_string(),
                    lat: Some(0.0),
                    long: Some(0.0),
                    cells: cells.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_unpadded_month_day_headers() {
        assert_eq!(parse_header_date("1/22/20").unwrap(), ymd(2020, 1, 22));
        assert_eq!(parse_header_date("12/31/21").unwrap(), ymd(2021, 12, 31));
    }

    #[test]
    fn rejects_headers_in_other_formats() {
        for bad in ["2020-01-22", "1/22/2020", "22.1.20", "notes", "13/1/20"] {
            let err = parse_header_date(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "header {bad}");
        }
    }

    #[test]
    fn emits_rows_in_column_order() {
        let t = table(&["1/22/20", "1/23/20", "1/24/20"], &[("Italy", &["0", "2", "5"])]);
        let records = reshape(&t).unwrap();
        let got: Vec<(NaiveDate, i64)> = records.iter().map(|r| (r.date, r.value)).collect();
        assert_eq!(
            got,
            vec![(ymd(2020, 1, 22), 0), (ymd(2020, 1, 23), 2), (ymd(2020, 1, 24), 5)]
        );
        assert!(records.iter().all(|r| r.region == "Italy"));
    }

    #[test]
    fn row_count_is_independent_of_column_order() {
        let ordered = table(
            &["1/22/20", "1/23/20", "1/24/20", "1/25/20"],
            &[("Italy", &["0", "2", "5", "9"])],
        );
        // Same (date, value) pairing, columns permuted.
        let shuffled = table(
            &["1/24/20", "1/22/20", "1/25/20", "1/23/20"],
            &[("Italy", &["5", "0", "9", "2"])],
        );

        let a = reshape(&ordered).unwrap();
        let b = reshape(&shuffled).unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(b.len(), 4);

        let mut a_pairs: Vec<(NaiveDate, i64)> = a.iter().map(|r| (r.date, r.value)).collect();
        let mut b_pairs: Vec<(NaiveDate, i64)> = b.iter().map(|r| (r.date, r.value)).collect();
        a_pairs.sort();
        b_pairs.sort();
        assert_eq!(a_pairs, b_pairs);
    }

    #[test]
    fn invalid_count_is_parse_error() {
        let t = table(&["1/22/20", "1/23/20"], &[("Italy", &["0", "n/a"])]);
        let err = reshape(&t).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.stage(), Stage::Reshape);
    }

    #[test]
    fn integral_float_counts_are_accepted() {
        let t = table(&["1/22/20"], &[("Italy", &["12.0"])]);
        assert_eq!(reshape(&t).unwrap()[0].value, 12);
    }

    #[test]
    fn duplicate_date_column_is_rejected() {
        let t = table(&["1/22/20", "01/22/20"], &[("Italy", &["1", "1"])]);
        assert_eq!(reshape(&t).unwrap_err().kind(), ErrorKind::Parse);
    }
}
