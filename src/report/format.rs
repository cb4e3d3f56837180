//! Formatted terminal output.
//!
//! Formatting lives in one place so the pipeline and fitting code stay free of
//! presentation details.

use crate::domain::{ForecastResult, PipelineConfig};
use crate::error::{AppError, ErrorKind, Stage};
use crate::fit::OrderSelection;
use crate::report::RegionStats;

/// Run header: title, data source, regions and raw table sizes.
pub fn format_run_header(config: &PipelineConfig, case_rows: usize, death_rows: usize) -> String {
    let mut out = String::new();
    out.push_str("=== epi - COVID-19 trends and forecast ===\n");
    if config.offline {
        out.push_str(&format!("Source: synthetic sample (seed={})\n", config.sample_seed));
    } else {
        out.push_str("Source: JHU CSSE global time series\n");
    }
    out.push_str(&format!("Regions: {}\n", config.regions.join(", ")));
    out.push_str(&format!(
        "Forecast: {} | horizon={}d | levels={}\n",
        config.forecast_region,
        config.horizon,
        fmt_levels(&config.levels)
    ));
    out.push_str(&format!("Raw rows: cases={case_rows} deaths={death_rows}\n"));
    out.push('\n');
    out
}

/// Per-region dataset table.
pub fn format_region_stats(stats: &[RegionStats]) -> String {
    let mut out = String::new();
    out.push_str("Dataset:\n");
    push_row(
        &mut out,
        format!(
            "{:<16} {:>6} {:<10} {:<10} {:>14} {:>12} {:>12} {:>5}",
            "region", "rows", "first", "last", "cases", "deaths", "avg7", "neg"
        ),
    );
    push_row(
        &mut out,
        format!(
            "{:-<16} {:-<6} {:-<10} {:-<10} {:-<14} {:-<12} {:-<12} {:-<5}",
            "", "", "", "", "", "", "", ""
        ),
    );
    for s in stats {
        let avg = s.latest_avg7.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string());
        push_row(
            &mut out,
            format!(
                "{:<16} {:>6} {:<10} {:<10} {:>14} {:>12} {:>12} {:>5}",
                truncate(&s.region, 16),
                s.rows,
                s.first_date,
                s.last_date,
                s.cumulative_cases,
                s.cumulative_deaths,
                avg,
                s.negative_days
            ),
        );
    }
    out.push('\n');
    out
}

/// Chosen model, coefficients and the candidate table.
pub fn format_model_summary(region: &str, selection: &OrderSelection) -> String {
    let best = &selection.best;
    let q = &best.quality;
    let mut out = String::new();

    out.push_str(&format!("Model for {region}:\n"));
    out.push_str(&format!("- order : {}\n", best.order));
    out.push_str(&format!("- ar    : {}\n", fmt_vec(&best.coefficients.ar)));
    out.push_str(&format!("- ma    : {}\n", fmt_vec(&best.coefficients.ma)));
    match (best.order.d, best.coefficients.mean) {
        (0, Some(m)) => out.push_str(&format!("- mean  : {m:.4}\n")),
        (_, Some(m)) => out.push_str(&format!("- drift : {m:.4}\n")),
        _ => {}
    }
    out.push_str(&format!("- sigma^2={:.4} loglik={:.3}\n", q.sigma2, q.log_likelihood));
    out.push_str(&format!("- AIC={:.3} AICc={:.3} BIC={:.3} (n={})\n", q.aic, q.aicc, q.bic, q.n));

    let kpss: Vec<String> = selection
        .kpss
        .iter()
        .enumerate()
        .map(|(d, s)| match s {
            Some(v) => format!("d={d}:{v:.3}"),
            None => format!("d={d}:-"),
        })
        .collect();
    out.push_str(&format!("- KPSS  : {}\n", kpss.join(" ")));

    out.push_str(&format!(
        "\nCandidates: {} fitted, {} skipped\n",
        selection.fits.len(),
        selection.skipped.len()
    ));
    for fit in &selection.fits {
        let chosen = if fit.order == best.order { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<14} AICc={:.3} sigma^2={:.4}\n",
            fit.order.to_string(),
            fit.quality.aicc,
            fit.quality.sigma2
        ));
    }
    for (order, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {order}) {reason}\n"));
    }
    out.push('\n');
    out
}

/// Forecast table with one column pair per interval level.
pub fn format_forecast_table(forecast: &ForecastResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Forecast for {} ({} steps, {}):\n",
        forecast.region,
        forecast.steps.len(),
        forecast.model.order
    ));

    let levels: Vec<f64> = forecast
        .steps
        .first()
        .map(|s| s.intervals.iter().map(|iv| iv.level).collect())
        .unwrap_or_default();

    let mut header = format!("{:>4} {:<10} {:>12}", "h", "date", "point");
    let mut rule = format!("{:-<4} {:-<10} {:-<12}", "", "", "");
    for level in &levels {
        header.push_str(&format!(" {:>12} {:>12}", format!("lo{level:.0}"), format!("hi{level:.0}")));
        rule.push_str(&format!(" {:-<12} {:-<12}", "", ""));
    }
    push_row(&mut out, header);
    push_row(&mut out, rule);

    for step in &forecast.steps {
        let mut row = format!("{:>4} {:<10} {:>12.1}", step.step, step.date, step.point);
        for iv in &step.intervals {
            row.push_str(&format!(" {:>12.1} {:>12.1}", iv.lower, iv.upper));
        }
        push_row(&mut out, row);
    }
    out.push('\n');
    out
}

/// Forecast as pretty JSON.
pub fn format_forecast_json(forecast: &ForecastResult) -> Result<String, AppError> {
    serde_json::to_string_pretty(forecast)
        .map(|s| s + "\n")
        .map_err(|e| AppError::new(ErrorKind::Terminal, Stage::Report, format!("Failed to encode forecast JSON: {e}")))
}

/// Package, platform and source listing.
pub fn format_environment(config: &PipelineConfig) -> String {
    let mut out = String::new();
    out.push_str("Environment:\n");
    out.push_str(&format!(
        "- {} {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str(&format!(
        "- platform: {}/{}\n",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));
    out.push_str(&format!("- worker threads: {}\n", rayon::current_num_threads()));
    if config.offline {
        out.push_str(&format!("- source: sample seed={}\n", config.sample_seed));
    } else {
        out.push_str(&format!("- cases : {}\n", config.cases_url));
        out.push_str(&format!("- deaths: {}\n", config.deaths_url));
    }
    out.push_str(&format!(
        "- search: max_p={} max_q={} max_order={} max_d={} | window={}\n",
        config.search.max_p, config.search.max_q, config.search.max_order, config.search.max_d, config.window
    ));
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn fmt_levels(levels: &[f64]) -> String {
    let parts: Vec<String> = levels.iter().map(|l| format!("{l:.0}%")).collect();
    parts.join("/")
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{
        ArimaCoefficients, ArimaFit, ArimaOrder, FitQuality, ForecastStep, PredictionInterval,
    };

    fn fit(order: ArimaOrder, aicc: f64) -> ArimaFit {
        ArimaFit {
            order,
            coefficients: ArimaCoefficients { ar: vec![0.5], ma: vec![], mean: Some(2.0) },
            quality: FitQuality { sigma2: 4.0, log_likelihood: -10.0, aic: 24.0, aicc, bic: 26.0, n: 50 },
            residuals: vec![],
        }
    }

    fn forecast() -> ForecastResult {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        ForecastResult {
            region: "US".to_string(),
            frequency: 365,
            model: fit(ArimaOrder::new(1, 1, 0), 25.0),
            steps: (1..=2)
                .map(|h| ForecastStep {
                    step: h,
                    date: start + chrono::Duration::days(h as i64),
                    point: 100.0,
                    intervals: vec![
                        PredictionInterval { level: 80.0, lower: 90.0, upper: 110.0 },
                        PredictionInterval { level: 95.0, lower: 85.0, upper: 115.0 },
                    ],
                })
                .collect(),
        }
    }

    #[test]
    fn forecast_table_has_column_per_level() {
        let txt = format_forecast_table(&forecast());
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "Forecast for US (2 steps, ARIMA(1,1,0)):");
        assert!(lines[1].contains("lo80") && lines[1].contains("hi95"));
        assert_eq!(
            lines[3],
            "   1 2021-01-02        100.0         90.0        110.0         85.0        115.0"
        );
        assert!(lines[4].starts_with("   2 2021-01-03"));
    }

    #[test]
    fn model_summary_marks_chosen_candidate() {
        let best = fit(ArimaOrder::new(1, 1, 0), 25.0);
        let selection = OrderSelection {
            best: best.clone(),
            fits: vec![fit(ArimaOrder::new(0, 1, 0), 30.0), best],
            skipped: vec![(ArimaOrder::new(5, 1, 0), "underdetermined".to_string())],
            kpss: vec![Some(2.5), Some(0.1)],
        };
        let txt = format_model_summary("US", &selection);
        assert!(txt.contains("- order : ARIMA(1,1,0)\n"));
        assert!(txt.contains("- drift : 2.0000\n"));
        assert!(txt.contains("- KPSS  : d=0:2.500 d=1:0.100\n"));
        assert!(txt.contains("* ARIMA(1,1,0)"));
        assert!(txt.contains("  ARIMA(0,1,0)"));
        assert!(txt.contains("(skipped ARIMA(5,1,0)) underdetermined"));
    }

    #[test]
    fn json_output_skips_residuals() {
        let json = format_forecast_json(&forecast()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["region"], "US");
        assert_eq!(value["steps"].as_array().unwrap().len(), 2);
        assert!(value["model"].get("residuals").is_none());
    }

    #[test]
    fn header_names_offline_source() {
        let config = PipelineConfig {
            offline: true,
            ..PipelineConfig::default()
        };
        let txt = format_run_header(&config, 3, 3);
        assert!(txt.contains("Source: synthetic sample (seed=42)"));
        assert!(txt.contains("levels=80%/95%"));
    }
}
