//! Automatic ARIMA order selection.
//!
//! 1. Reject degenerate input (short, non-finite, constant).
//! 2. Choose `d` by repeated KPSS tests at the 5% level.
//! 3. Fit every `(p, q)` on the grid for that `d` (parallel).
//! 4. Choose the minimum AICc; ties go to the earlier (simpler) grid entry.

use rayon::prelude::*;

use crate::domain::{ArimaFit, ArimaOrder, OrderSearch};
use crate::error::AppError;
use crate::fit::arima::fit_arima;
use crate::fit::order_grid::{order_grid, validate_search};
use crate::math::{KPSS_CRITICAL_5PCT, difference, is_constant, kpss_level_statistic};

/// Shortest series the search will accept.
pub const MIN_SERIES_LEN: usize = 10;

/// Output of order search + fitting.
#[derive(Debug, Clone)]
pub struct OrderSelection {
    pub best: ArimaFit,
    /// Fits for all admissible candidates, in grid order.
    pub fits: Vec<ArimaFit>,
    /// Candidates that could not be fit and why.
    pub skipped: Vec<(ArimaOrder, String)>,
    /// KPSS statistic at each differencing level tested.
    pub kpss: Vec<Option<f64>>,
}

/// Fit the AICc-best ARIMA model to `series`.
pub fn auto_arima(series: &[f64], search: &OrderSearch) -> Result<OrderSelection, AppError> {
    validate_search(search)?;
    check_series(series)?;

    let (d, kpss) = choose_d(series, search.max_d);
    let grid = order_grid(search, d);
    let condition_on = grid.iter().map(|o| o.p).max().unwrap_or(0);

    tracing::info!(d, candidates = grid.len(), "searching ARIMA orders");

    let outcomes: Vec<(ArimaOrder, Result<ArimaFit, AppError>)> = grid
        .par_iter()
        .map(|&order| (order, fit_arima(series, order, condition_on)))
        .collect();

    let mut fits = Vec::new();
    let mut skipped = Vec::new();
    for (order, outcome) in outcomes {
        match outcome {
            Ok(fit) => fits.push(fit),
            Err(err) => {
                tracing::warn!(%order, reason = err.message(), "skipped candidate");
                skipped.push((order, err.message().to_string()));
            }
        }
    }

    let best = select_by_aicc(&fits)
        .cloned()
        .ok_or_else(|| AppError::model_fit("No admissible ARIMA candidate after guardrails."))?;

    tracing::info!(order = %best.order, aicc = best.quality.aicc, "selected model");

    Ok(OrderSelection {
        best,
        fits,
        skipped,
        kpss,
    })
}

/// Reject inputs no model can be fit to.
pub fn check_series(series: &[f64]) -> Result<(), AppError> {
    if series.len() < MIN_SERIES_LEN {
        return Err(AppError::model_fit(format!(
            "Series too short: {} samples < {MIN_SERIES_LEN}.",
            series.len()
        )));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AppError::model_fit("Series contains non-finite values."));
    }
    if is_constant(series) {
        return Err(AppError::model_fit("Series is constant; nothing to model."));
    }
    // A constant cumulative count differences to `[c, 0, 0, ...]`.
    if is_constant(&series[1..]) {
        return Err(AppError::model_fit(
            "Series is constant after the first sample; nothing to model.",
        ));
    }
    Ok(())
}

/// Smallest `d <= max_d` whose differenced series passes KPSS.
///
/// A differenced series with no variance left counts as stationary.
pub fn choose_d(series: &[f64], max_d: usize) -> (usize, Vec<Option<f64>>) {
    let mut stats = Vec::new();
    for d in 0..=max_d {
        let w = difference(series, d);
        let stat = kpss_level_statistic(&w);
        stats.push(stat);
        match stat {
            Some(s) if s > KPSS_CRITICAL_5PCT => continue,
            _ => return (d, stats),
        }
    }
    (max_d, stats)
}

fn select_by_aicc(fits: &[ArimaFit]) -> Option<&ArimaFit> {
    let mut best: Option<&ArimaFit> = None;
    for f in fits {
        if !f.quality.aicc.is_finite() {
            continue;
        }
        match best {
            Some(b) if f.quality.aicc >= b.quality.aicc => {}
            _ => best = Some(f),
        }
    }
    best
}
