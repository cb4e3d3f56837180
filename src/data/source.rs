//! Remote CSV source for the wide cumulative time-series tables.
//!
//! Each file has four leading geographic columns
//! (`Province/State`, `Country/Region`, `Lat`, `Long`) followed by one column per
//! calendar date. Date headers are kept verbatim here; the reshaper parses them.

use std::collections::HashMap;
use std::io::Read;

use csv::StringRecord;
use reqwest::blocking::Client;

use crate::domain::{Metric, RawRow, RawSeriesTable};
use crate::error::{AppError, Stage};

const COL_PROVINCE: &str = "province/state";
const COL_REGION: &str = "country/region";
const COL_LAT: &str = "lat";
const COL_LONG: &str = "long";

const GEO_COLUMNS: [&str; 4] = [COL_PROVINCE, COL_REGION, COL_LAT, COL_LONG];

pub struct SourceClient {
    client: Client,
}

impl SourceClient {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("epi-trends/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::fetch(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch one wide table.
    pub fn fetch_table(&self, metric: Metric, url: &str) -> Result<RawSeriesTable, AppError> {
        tracing::info!(metric = metric.label(), %url, "fetching dataset");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::fetch(format!("{} request failed: {e}", metric.label())))?;

        if !resp.status().is_success() {
            return Err(AppError::fetch(format!(
                "{} request failed with status {}.",
                metric.label(),
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::fetch(format!("Failed to read {} response body: {e}", metric.label())))?;

        let table = parse_table(metric, body.as_bytes())?;
        tracing::info!(
            metric = metric.label(),
            rows = table.rows.len(),
            dates = table.date_headers.len(),
            "dataset loaded"
        );
        Ok(table)
    }

    /// Fetch the cases and deaths tables concurrently.
    pub fn fetch_pair(
        &self,
        cases_url: &str,
        deaths_url: &str,
    ) -> Result<(RawSeriesTable, RawSeriesTable), AppError> {
        let (cases, deaths) = rayon::join(
            || self.fetch_table(Metric::Cases, cases_url),
            || self.fetch_table(Metric::Deaths, deaths_url),
        );
        Ok((cases?, deaths?))
    }
}

/// Parse a wide table from any CSV reader.
pub fn parse_table<R: Read>(metric: Metric, reader: R) -> Result<RawSeriesTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::schema(Stage::Load, format!("Failed to read {} CSV headers: {e}", metric.label())))?
        .clone();

    let header_map = build_header_map(&headers);
    for name in GEO_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::schema(
                Stage::Load,
                format!("Missing required column in {} table: `{name}`", metric.label()),
            ));
        }
    }

    // Everything that is not a geographic column is a date column, in file order.
    let date_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !GEO_COLUMNS.contains(&normalize_header_name(name).as_str()))
        .map(|(idx, name)| (idx, name.trim().to_string()))
        .collect();

    if date_columns.is_empty() {
        return Err(AppError::schema(
            Stage::Load,
            format!("The {} table has no date columns.", metric.label()),
        ));
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: one for the header row, one for 1-based line numbers.
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::schema(
                Stage::Load,
                format!("Malformed {} CSV row at line {line}: {e}", metric.label()),
            )
        })?;

        let region = get_optional(&record, &header_map, COL_REGION)
            .ok_or_else(|| {
                AppError::schema(
                    Stage::Load,
                    format!("Missing `Country/Region` value at line {line} of the {} table.", metric.label()),
                )
            })?
            .to_string();

        let cells = date_columns
            .iter()
            .map(|(col, _)| record.get(*col).unwrap_or("").to_string())
            .collect();

        rows.push(RawRow {
            province: get_optional(&record, &header_map, COL_PROVINCE).map(str::to_string),
            region,
            lat: parse_opt_f64(get_optional(&record, &header_map, COL_LAT)),
            long: parse_opt_f64(get_optional(&record, &header_map, COL_LONG)),
            cells,
        });
    }

    Ok(RawSeriesTable {
        metric,
        date_headers: date_columns.into_iter().map(|(_, name)| name).collect(),
        rows,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Some exports prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const WIDE: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,Italy,41.87,12.56,0,2,5
Ontario,Canada,51.25,-85.32,1,1,3
";

    #[test]
    fn parses_geo_columns_and_date_headers() {
        let table = parse_table(Metric::Cases, WIDE.as_bytes()).unwrap();
        assert_eq!(table.date_headers, vec!["1/22/20", "1/23/20", "1/24/20"]);
        assert_eq!(table.rows.len(), 2);

        let italy = &table.rows[0];
        assert_eq!(italy.region, "Italy");
        assert_eq!(italy.province, None);
        assert_eq!(italy.cells, vec!["0", "2", "5"]);

        let ontario = &table.rows[1];
        assert_eq!(ontario.province.as_deref(), Some("Ontario"));
        assert!((ontario.long.unwrap() + 85.32).abs() < 1e-12);
    }

    #[test]
    fn ignores_utf8_bom_on_first_header() {
        let csv = format!("\u{feff}{WIDE}");
        let table = parse_table(Metric::Deaths, csv.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.metric, Metric::Deaths);
    }

    #[test]
    fn missing_geo_column_is_schema_error() {
        let csv = "Country/Region,Lat,Long,1/22/20\nItaly,1,2,0\n";
        let err = parse_table(Metric::Cases, csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.stage(), Stage::Load);
    }

    #[test]
    fn table_without_dates_is_schema_error() {
        let csv = "Province/State,Country/Region,Lat,Long\n,Italy,1,2\n";
        let err = parse_table(Metric::Cases, csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn non_tabular_body_is_schema_error() {
        let body = "<!DOCTYPE html>\n<html><body>404</body></html>\n";
        let err = parse_table(Metric::Cases, body.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn ragged_row_is_schema_error() {
        let csv = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n,Italy,1,2,0\n";
        let err = parse_table(Metric::Cases, csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }
}
