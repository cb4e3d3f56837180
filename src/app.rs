//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - runs the pipeline
//! - prints the report or hands off to the TUI

use clap::Parser;

use crate::cli::{Command, RunArgs};
use crate::domain::{OrderSearch, PipelineConfig};
use crate::error::AppError;
use crate::fit::validate_search;
use crate::plot::{average_series, cumulative_series, render_forecast_chart, render_line_chart};
use crate::report::{
    format_environment, format_forecast_json, format_forecast_table, format_model_summary, format_region_stats,
    format_run_header,
};

pub mod pipeline;

/// Entry point for the `epi` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Report(args) => {
            crate::logging::init_tracing("info");
            handle_report(args)
        }
        Command::Tui(args) => {
            // Log lines would corrupt the alternate screen.
            crate::logging::init_tracing("off");
            handle_tui(args)
        }
    }
}

fn handle_report(args: RunArgs) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    let run = pipeline::run_pipeline(&config)?;

    print!("{}", format_run_header(&config, run.case_rows, run.death_rows));
    print!("{}", format_region_stats(&run.stats));

    if config.plot {
        let cumulative = cumulative_series(&run.records, &config.regions);
        println!(
            "{}",
            render_line_chart("Cumulative cases", &cumulative, config.plot_width, config.plot_height)
        );
        let averages = average_series(&run.records, &config.regions);
        let title = format!("Daily cases, {}-day average", config.window);
        println!(
            "{}",
            render_line_chart(&title, &averages, config.plot_width, config.plot_height)
        );
    }

    print!("{}", format_model_summary(&config.forecast_region, &run.selection));

    if config.plot {
        let band_level = config.levels.iter().copied().fold(f64::NAN, f64::max);
        let title = format!("Forecast, {}", config.forecast_region);
        println!(
            "{}",
            render_forecast_chart(
                &title,
                &run.history,
                &run.forecast,
                band_level,
                config.plot_width,
                config.plot_height
            )
        );
    }

    if config.json {
        print!("{}", format_forecast_json(&run.forecast)?);
    } else {
        print!("{}", format_forecast_table(&run.forecast));
    }

    print!("{}", format_environment(&config));
    Ok(())
}

fn handle_tui(args: RunArgs) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    crate::tui::run(config)
}

/// Build and validate the pipeline configuration.
pub fn config_from_args(args: &RunArgs) -> Result<PipelineConfig, AppError> {
    let mut regions: Vec<String> = Vec::new();
    for r in &args.regions {
        let r = r.trim();
        if !r.is_empty() && !regions.iter().any(|x| x == r) {
            regions.push(r.to_string());
        }
    }
    if regions.is_empty() {
        return Err(AppError::config("At least one --region is required."));
    }

    let forecast_region = match &args.forecast_region {
        Some(r) => r.trim().to_string(),
        None => regions[0].clone(),
    };
    if !regions.contains(&forecast_region) {
        return Err(AppError::config(format!(
            "Forecast region '{forecast_region}' must be one of the configured regions ({}).",
            regions.join(", ")
        )));
    }

    if args.horizon == 0 {
        return Err(AppError::config("Forecast horizon must be >= 1."));
    }
    if args.window == 0 {
        return Err(AppError::config("Moving-average window must be >= 1."));
    }
    if args.levels.is_empty() {
        return Err(AppError::config("At least one interval --level is required."));
    }
    if let Some(bad) = args.levels.iter().find(|l| !(l.is_finite() && **l > 0.0 && **l < 100.0)) {
        return Err(AppError::config(format!("Interval level {bad} must be in (0, 100).")));
    }

    let search = OrderSearch {
        max_p: args.max_p,
        max_q: args.max_q,
        max_order: args.max_order,
        max_d: args.max_d,
    };
    validate_search(&search).map_err(|e| AppError::config(e.message()))?;

    Ok(PipelineConfig {
        cases_url: args.cases_url.clone(),
        deaths_url: args.deaths_url.clone(),
        offline: args.offline,
        sample_seed: args.seed,
        regions,
        forecast_region,
        horizon: args.horizon,
        window: args.window,
        levels: args.levels.clone(),
        search,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        json: args.json,
    })
}

/// Rewrite argv so `epi` defaults to `epi report`.
///
/// Rules:
/// - `epi`                      -> `epi report`
/// - `epi --offline ...`        -> `epi report --offline ...`
/// - `epi --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("report".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "report" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "report flags".
    if arg1.starts_with('-') {
        argv.insert(1, "report".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::error::ErrorKind;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["epi", "report"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Report(a) | Command::Tui(a) => a,
        }
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_report() {
        assert_eq!(rewrite_args(strings(&["epi"])), strings(&["epi", "report"]));
        assert_eq!(
            rewrite_args(strings(&["epi", "--offline"])),
            strings(&["epi", "report", "--offline"])
        );
        assert_eq!(rewrite_args(strings(&["epi", "tui"])), strings(&["epi", "tui"]));
        assert_eq!(rewrite_args(strings(&["epi", "--help"])), strings(&["epi", "--help"]));
    }

    #[test]
    fn forecast_region_defaults_to_first_region() {
        let config = config_from_args(&args(&["-r", "India", "-r", "US"])).unwrap();
        assert_eq!(config.forecast_region, "India");
        assert_eq!(config.regions, strings(&["India", "US"]));
    }

    #[test]
    fn forecast_region_outside_allow_list_is_rejected() {
        let err = config_from_args(&args(&["--forecast-region", "Spain"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn invalid_numeric_settings_are_rejected() {
        assert!(config_from_args(&args(&["--horizon", "0"])).is_err());
        assert!(config_from_args(&args(&["--window", "0"])).is_err());
        assert!(config_from_args(&args(&["--level", "100"])).is_err());
        assert!(config_from_args(&args(&["--max-d", "3"])).is_err());
    }

    #[test]
    fn duplicate_regions_are_collapsed() {
        let config = config_from_args(&args(&["-r", "US", "-r", "US", "-r", "India"])).unwrap();
        assert_eq!(config.regions, strings(&["US", "India"]));
    }
}
