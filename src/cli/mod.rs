//! Command-line parsing for the `epi` trends and forecast tool.
//!
//! Argument parsing and command dispatch stay separate from the data and
//! modeling code.

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    DEFAULT_CASES_URL, DEFAULT_DEATHS_URL, DEFAULT_HORIZON, DEFAULT_LEVELS, DEFAULT_REGIONS, DEFAULT_WINDOW,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "epi", version, about = "COVID-19 daily trends and ARIMA forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline and print the terminal report (default).
    Report(RunArgs),
    /// Launch the interactive chart viewer.
    ///
    /// Runs the same pipeline as `epi report` and renders the charts with
    /// Ratatui.
    Tui(RunArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Country/Region to include (repeatable).
    #[arg(short = 'r', long = "region", default_values = DEFAULT_REGIONS.iter().copied())]
    pub regions: Vec<String>,

    /// Region to forecast (defaults to the first --region).
    #[arg(long)]
    pub forecast_region: Option<String>,

    /// Forecast horizon in days.
    #[arg(long, default_value_t = DEFAULT_HORIZON)]
    pub horizon: usize,

    /// Trailing moving-average window in days.
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Prediction interval level in percent (repeatable).
    #[arg(long = "level", default_values_t = DEFAULT_LEVELS.to_vec())]
    pub levels: Vec<f64>,

    /// Largest AR order searched.
    #[arg(long, default_value_t = 5)]
    pub max_p: usize,

    /// Largest MA order searched.
    #[arg(long, default_value_t = 5)]
    pub max_q: usize,

    /// Largest p + q searched.
    #[arg(long, default_value_t = 5)]
    pub max_order: usize,

    /// Largest differencing order.
    #[arg(long, default_value_t = 2)]
    pub max_d: usize,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Print the forecast as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Use generated sample data instead of fetching.
    #[arg(long)]
    pub offline: bool,

    /// Random seed for the offline sample.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Confirmed-cases CSV URL.
    #[arg(long, env = "EPI_CASES_URL", default_value = DEFAULT_CASES_URL)]
    pub cases_url: String,

    /// Deaths CSV URL.
    #[arg(long, env = "EPI_DEATHS_URL", default_value = DEFAULT_DEATHS_URL)]
    pub deaths_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        match Cli::try_parse_from(args).unwrap().command {
            Command::Report(a) | Command::Tui(a) => a,
        }
    }

    #[test]
    fn defaults_match_the_documented_run() {
        let args = parse(&["epi", "report"]);
        assert_eq!(args.regions, vec!["US".to_string(), "India".to_string()]);
        assert_eq!(args.forecast_region, None);
        assert_eq!(args.horizon, 30);
        assert_eq!(args.window, 7);
        assert_eq!(args.levels, vec![80.0, 95.0]);
        assert!(!args.offline);
    }

    #[test]
    fn repeated_regions_replace_defaults() {
        let args = parse(&["epi", "tui", "-r", "Spain", "--region", "Italy", "--forecast-region", "Italy"]);
        assert_eq!(args.regions, vec!["Spain".to_string(), "Italy".to_string()]);
        assert_eq!(args.forecast_region.as_deref(), Some("Italy"));
    }

    #[test]
    fn subcommand_is_required_by_clap() {
        assert!(Cli::try_parse_from(["epi"]).is_err());
    }
}
