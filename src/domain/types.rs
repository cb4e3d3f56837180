//! Shared domain types.
//!
//! Each pipeline stage consumes one of these types and produces the next:
//!
//! `RawSeriesTable` → `TidyRecord` → `JoinedRecord` → `DailyRecord` →
//! `SmoothedRecord`, and one region's daily cases → `ArimaFit` → `ForecastResult`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CASES_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_global.csv";
pub const DEFAULT_DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_global.csv";

/// Regions plotted and tabulated by default.
pub const DEFAULT_REGIONS: [&str; 2] = ["US", "India"];

/// Forecast horizon (days).
pub const DEFAULT_HORIZON: usize = 30;

/// Trailing moving-average window (days).
pub const DEFAULT_WINDOW: usize = 7;

/// Prediction interval levels (percent).
pub const DEFAULT_LEVELS: [f64; 2] = [80.0, 95.0];

/// Samples per year used when treating daily counts as a periodic series.
///
/// Seasonal terms are never fitted; the value is reported with the model.
pub const SERIES_FREQUENCY: usize = 365;

/// Which cumulative count a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cases,
    Deaths,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::Deaths => "deaths",
        }
    }
}

/// One row of a wide table: a region (and optional sub-region) with one raw
/// cell per date column.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub province: Option<String>,
    pub region: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    /// Raw cell text, aligned with `RawSeriesTable::date_headers`.
    pub cells: Vec<String>,
}

/// Wide-format cumulative table, one column per calendar date.
#[derive(Debug, Clone)]
pub struct RawSeriesTable {
    pub metric: Metric,
    /// Date column headers in file order (e.g. `1/22/20`).
    pub date_headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Long/tidy cumulative observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TidyRecord {
    pub region: String,
    pub date: NaiveDate,
    pub value: i64,
}

/// Cases and deaths for the same region and date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRecord {
    pub region: String,
    pub date: NaiveDate,
    pub cumulative_cases: i64,
    pub cumulative_deaths: i64,
}

/// A joined record plus first-differenced (daily) counts.
///
/// The first record of a region carries its full cumulative value as the
/// daily value (differenced against zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRecord {
    pub record: JoinedRecord,
    pub daily_cases: i64,
    pub daily_deaths: i64,
}

/// A daily record plus the trailing average of daily cases.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedRecord {
    pub daily: DailyRecord,
    /// `None` while fewer than `window` samples are available.
    pub daily_cases_avg7: Option<f64>,
}

impl SmoothedRecord {
    pub fn region(&self) -> &str {
        &self.daily.record.region
    }

    pub fn date(&self) -> NaiveDate {
        self.daily.record.date
    }
}

/// Non-seasonal ARIMA order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// A mean (d=0) or drift (d=1) term is estimated; none for d≥2.
    pub fn has_constant(self) -> bool {
        self.d <= 1
    }

    /// Estimated parameters including the innovation variance.
    pub fn param_count(self) -> usize {
        self.p + self.q + usize::from(self.has_constant()) + 1
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Fitted coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Mean of the differenced series (intercept for d=0, drift for d=1).
    pub mean: Option<f64>,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    /// Observations contributing to the conditional likelihood.
    pub n: usize,
}

/// A fitted ARIMA model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub coefficients: ArimaCoefficients,
    pub quality: FitQuality,
    /// Conditional residuals on the differenced scale.
    #[serde(skip)]
    pub residuals: Vec<f64>,
}

/// Two-sided prediction interval at `level` percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictionInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

impl PredictionInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Forecast for one future step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastStep {
    /// 1-based step ahead of the last observation.
    pub step: usize,
    pub date: NaiveDate,
    pub point: f64,
    pub intervals: Vec<PredictionInterval>,
}

impl ForecastStep {
    pub fn interval(&self, level: f64) -> Option<&PredictionInterval> {
        self.intervals.iter().find(|i| (i.level - level).abs() < 1e-9)
    }
}

/// Forecast output for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub region: String,
    pub frequency: usize,
    pub model: ArimaFit,
    pub steps: Vec<ForecastStep>,
}

/// Bounds of the automatic order search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSearch {
    pub max_p: usize,
    pub max_q: usize,
    /// Upper bound on `p + q`.
    pub max_order: usize,
    pub max_d: usize,
}

impl Default for OrderSearch {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_order: 5,
            max_d: 2,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and environment).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cases_url: String,
    pub deaths_url: String,
    /// Use the synthetic sample tables instead of fetching.
    pub offline: bool,
    pub sample_seed: u64,

    /// Region allow-list (Country/Region values).
    pub regions: Vec<String>,
    /// Region whose daily cases are forecast; must be in `regions`.
    pub forecast_region: String,

    pub horizon: usize,
    pub window: usize,
    pub levels: Vec<f64>,
    pub search: OrderSearch,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cases_url: DEFAULT_CASES_URL.to_string(),
            deaths_url: DEFAULT_DEATHS_URL.to_string(),
            offline: false,
            sample_seed: 42,
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            forecast_region: DEFAULT_REGIONS[0].to_string(),
            horizon: DEFAULT_HORIZON,
            window: DEFAULT_WINDOW,
            levels: DEFAULT_LEVELS.to_vec(),
            search: OrderSearch::default(),
            plot: true,
            plot_width: 100,
            plot_height: 20,
            json: false,
        }
    }
}
