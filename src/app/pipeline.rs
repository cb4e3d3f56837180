//! Shared pipeline logic used by both the report and TUI front-ends.
//!
//! load -> reshape -> join -> daily counts -> smooth -> order search -> forecast
//!
//! The front-ends only handle presentation (printing vs widgets).

use chrono::NaiveDate;

use crate::data::{SAMPLE_DAYS, SourceClient, join, reshape, sample_tables};
use crate::domain::{ForecastResult, PipelineConfig, RawSeriesTable, SmoothedRecord};
use crate::error::AppError;
use crate::fit::{OrderSelection, auto_arima};
use crate::models::forecast_region;
use crate::report::{RegionStats, region_stats};
use crate::transform::{daily_case_series, daily_counts, smooth_daily_cases};

/// All computed outputs of one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub case_rows: usize,
    pub death_rows: usize,
    /// Smoothed daily records for the allow-listed regions.
    pub records: Vec<SmoothedRecord>,
    pub stats: Vec<RegionStats>,
    /// Forecast region's observed daily cases.
    pub history: Vec<(NaiveDate, f64)>,
    pub selection: OrderSelection,
    pub forecast: ForecastResult,
}

/// Fetch (or generate) the raw cases and deaths tables.
pub fn load_tables(config: &PipelineConfig) -> Result<(RawSeriesTable, RawSeriesTable), AppError> {
    if config.offline {
        return sample_tables(&config.regions, config.sample_seed, SAMPLE_DAYS);
    }
    let client = SourceClient::new()?;
    client.fetch_pair(&config.cases_url, &config.deaths_url)
}

/// Execute the full pipeline.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, AppError> {
    let (cases, deaths) = load_tables(config)?;
    run_with_tables(config, &cases, &deaths)
}

/// Execute the pipeline on already-loaded tables.
pub fn run_with_tables(
    config: &PipelineConfig,
    cases: &RawSeriesTable,
    deaths: &RawSeriesTable,
) -> Result<RunOutput, AppError> {
    let tidy_cases = reshape(cases)?;
    let tidy_deaths = reshape(deaths)?;
    tracing::info!(cases = tidy_cases.len(), deaths = tidy_deaths.len(), "reshaped tables");

    let joined = join(&tidy_cases, &tidy_deaths);
    let daily = daily_counts(&joined, &config.regions);
    let records = smooth_daily_cases(&daily, config.window)?;
    let stats = region_stats(&records, &config.regions);

    let (dates, values) = daily_case_series(&records, &config.forecast_region)?;
    let selection = auto_arima(&values, &config.search)?;

    let last_date = dates
        .last()
        .copied()
        .ok_or_else(|| AppError::model_fit("Forecast series has no dates."))?;
    let forecast = forecast_region(
        &config.forecast_region,
        &values,
        last_date,
        &selection.best,
        config.horizon,
        &config.levels,
    )?;

    Ok(RunOutput {
        case_rows: cases.rows.len(),
        death_rows: deaths.rows.len(),
        records,
        stats,
        history: dates.into_iter().zip(values).collect(),
        selection,
        forecast,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn offline_config() -> PipelineConfig {
        PipelineConfig {
            offline: true,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn offline_run_produces_thirty_step_forecast() {
        let config = offline_config();
        let run = run_pipeline(&config).unwrap();

        assert_eq!(run.stats.len(), 2);
        assert_eq!(run.stats[0].region, "US");
        assert_eq!(run.stats[0].rows, SAMPLE_DAYS);
        assert_eq!(run.history.len(), SAMPLE_DAYS);

        assert_eq!(run.forecast.steps.len(), 30);
        let first = run.forecast.steps[0].interval(95.0).unwrap().width();
        let last = run.forecast.steps[29].interval(95.0).unwrap().width();
        assert!(last >= first);
        assert_eq!(run.forecast.steps[0].date, run.history[SAMPLE_DAYS - 1].0.succ_opt().unwrap());
    }

    #[test]
    fn sub_regions_are_summed_before_joining() {
        let config = PipelineConfig {
            regions: vec!["US".to_string(), "Australia".to_string()],
            ..offline_config()
        };
        let (cases, deaths) = sample_tables(&["US".to_string()], 3, 60).unwrap();
        let run = run_with_tables(&config, &cases, &deaths).unwrap();

        let australia: Vec<&SmoothedRecord> = run.records.iter().filter(|r| r.region() == "Australia").collect();
        assert_eq!(australia.len(), 60);

        let provinces: i64 = cases
            .rows
            .iter()
            .filter(|r| r.region == "Australia")
            .map(|r| r.cells[59].parse::<i64>().unwrap())
            .sum();
        assert_eq!(australia[59].daily.record.cumulative_cases, provinces);
    }

    #[test]
    fn unknown_forecast_region_is_join_error() {
        let config = PipelineConfig {
            forecast_region: "Atlantis".to_string(),
            ..offline_config()
        };
        let (cases, deaths) = sample_tables(&config.regions, 1, 40).unwrap();
        let err = run_with_tables(&config, &cases, &deaths).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Join);
    }

    #[test]
    fn constant_cumulative_cases_are_a_model_fit_error() {
        let config = offline_config();
        for level in ["0", "5"] {
            let (mut cases, deaths) = sample_tables(&config.regions, 2, 30).unwrap();
            for row in cases.rows.iter_mut().filter(|r| r.region == "US") {
                row.cells.iter_mut().for_each(|c| *c = level.to_string());
            }
            let err = run_with_tables(&config, &cases, &deaths).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ModelFit, "cumulative {level}");
        }
    }
}
