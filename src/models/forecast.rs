//! Multi-step forecasts from a fitted ARIMA model.
//!
//! Point forecasts recurse on the differenced scale with future innovations
//! set to zero, then integrate back `d` times. Forecast variance uses the
//! ψ-weights of `φ(B)(1-B)^d x_t = θ(B) e_t`:
//!
//! ```text
//! se_h = σ · sqrt(ψ_0² + ... + ψ_{h-1}²)
//! ```

use chrono::{Days, NaiveDate};

use crate::domain::{ArimaFit, ForecastResult, ForecastStep, PredictionInterval, SERIES_FREQUENCY};
use crate::error::AppError;
use crate::math::{difference, normal_quantile_for_level};

/// First `n` ψ-weights of the integrated model.
pub fn psi_weights(ar: &[f64], ma: &[f64], d: usize, n: usize) -> Vec<f64> {
    // φ*(B) = φ(B)(1-B)^d as lag-polynomial coefficients, phi_star[0] = 1.
    let mut poly: Vec<f64> = std::iter::once(1.0).chain(ar.iter().map(|a| -a)).collect();
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }

    let mut psi = Vec::with_capacity(n);
    for j in 0..n {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut v = ma.get(j - 1).copied().unwrap_or(0.0);
        for i in 1..poly.len().min(j + 1) {
            v -= poly[i] * psi[j - i];
        }
        psi.push(v);
    }
    psi
}

/// Point forecasts for the next `horizon` steps on the original scale.
pub fn point_forecast(series: &[f64], fit: &ArimaFit, horizon: usize) -> Result<Vec<f64>, AppError> {
    let d = fit.order.d;
    let mut w = difference(series, d);
    if w.len() != fit.residuals.len() {
        return Err(AppError::model_fit(format!(
            "Residuals ({}) do not match the differenced series ({}).",
            fit.residuals.len(),
            w.len()
        )));
    }
    if w.is_empty() {
        return Err(AppError::model_fit("Cannot forecast an empty series."));
    }

    let coeffs = &fit.coefficients;
    let mu = coeffs.mean.unwrap_or(0.0);
    let mut e = fit.residuals.clone();

    let mut future = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let t = w.len();
        let mut pred = mu;
        for (i, a) in coeffs.ar.iter().enumerate() {
            if t > i {
                pred += a * (w[t - i - 1] - mu);
            }
        }
        for (j, b) in coeffs.ma.iter().enumerate() {
            if t > j {
                pred += b * e[t - j - 1];
            }
        }
        w.push(pred);
        e.push(0.0);
        future.push(pred);
    }

    for k in (0..d).rev() {
        let base = difference(series, k).last().copied().unwrap_or(0.0);
        future = future
            .into_iter()
            .scan(base, |acc, v| {
                *acc += v;
                Some(*acc)
            })
            .collect();
    }

    Ok(future)
}

/// Forecast standard error for steps `1..=horizon`.
pub fn forecast_standard_errors(fit: &ArimaFit, horizon: usize) -> Vec<f64> {
    let sigma = fit.quality.sigma2.sqrt();
    let psi = psi_weights(&fit.coefficients.ar, &fit.coefficients.ma, fit.order.d, horizon);
    psi.iter()
        .scan(0.0, |acc, p| {
            *acc += p * p;
            Some(sigma * acc.sqrt())
        })
        .collect()
}

/// Forecast `horizon` days past `last_date` with intervals at `levels` percent.
pub fn forecast_region(
    region: &str,
    series: &[f64],
    last_date: NaiveDate,
    fit: &ArimaFit,
    horizon: usize,
    levels: &[f64],
) -> Result<ForecastResult, AppError> {
    let points = point_forecast(series, fit, horizon)?;
    let se = forecast_standard_errors(fit, horizon);

    let quantiles = levels
        .iter()
        .map(|&level| {
            normal_quantile_for_level(level)
                .map(|z| (level, z))
                .ok_or_else(|| AppError::config(format!("Interval level {level} must be in (0, 100).")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut steps = Vec::with_capacity(horizon);
    for (i, (&point, &s)) in points.iter().zip(&se).enumerate() {
        let step = i + 1;
        let date = last_date
            .checked_add_days(Days::new(step as u64))
            .ok_or_else(|| AppError::model_fit("Forecast date out of range."))?;
        let intervals = quantiles
            .iter()
            .map(|&(level, z)| PredictionInterval {
                level,
                lower: point - z * s,
                upper: point + z * s,
            })
            .collect();
        steps.push(ForecastStep {
            step,
            date,
            point,
            intervals,
        });
    }

    tracing::info!(%region, order = %fit.order, horizon, "forecast complete");

    Ok(ForecastResult {
        region: region.to_string(),
        frequency: SERIES_FREQUENCY,
        model: fit.clone(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArimaCoefficients, ArimaOrder, OrderSearch};
    use crate::fit::{auto_arima, fit_quality};

    fn manual_fit(order: ArimaOrder, ar: Vec<f64>, ma: Vec<f64>, mean: Option<f64>, residuals: Vec<f64>) -> ArimaFit {
        ArimaFit {
            order,
            coefficients: ArimaCoefficients { ar, ma, mean },
            quality: fit_quality(residuals.len() as f64, residuals.len(), order.param_count()),
            residuals,
        }
    }

    #[test]
    fn random_walk_psi_weights_are_one() {
        assert_eq!(psi_weights(&[], &[], 1, 5), vec![1.0; 5]);
    }

    #[test]
    fn ar1_psi_weights_are_powers() {
        let psi = psi_weights(&[0.5], &[], 0, 5);
        for (j, p) in psi.iter().enumerate() {
            assert!((p - 0.5_f64.powi(j as i32)).abs() < 1e-12);
        }
    }

    #[test]
    fn ma1_psi_weights_truncate() {
        assert_eq!(psi_weights(&[], &[0.4], 0, 4), vec![1.0, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn drift_random_walk_extends_linearly() {
        let series = [10.0, 12.0, 14.0, 16.0];
        let fit = manual_fit(ArimaOrder::new(0, 1, 0), vec![], vec![], Some(2.0), vec![0.0; 3]);
        let points = point_forecast(&series, &fit, 3).unwrap();
        assert_eq!(points, vec![18.0, 20.0, 22.0]);
    }

    #[test]
    fn second_difference_integrates_twice() {
        // Quadratic with constant second difference 2; ARIMA(0,2,0) keeps curvature zero.
        let series = [0.0, 1.0, 4.0, 9.0];
        let fit = manual_fit(ArimaOrder::new(0, 2, 0), vec![], vec![], None, vec![0.0; 2]);
        let points = point_forecast(&series, &fit, 2).unwrap();
        // Last first-difference is 5, forecast differences stay at 5.
        assert_eq!(points, vec![14.0, 19.0]);
    }

    #[test]
    fn mismatched_residuals_are_rejected() {
        let fit = manual_fit(ArimaOrder::new(0, 1, 0), vec![], vec![], Some(0.0), vec![0.0; 2]);
        assert!(point_forecast(&[1.0, 2.0, 3.0, 4.0], &fit, 1).is_err());
    }

    #[test]
    fn thirty_step_forecast_has_widening_intervals() {
        let series: Vec<f64> = (0..150)
            .map(|t| 1000.0 + 25.0 * t as f64 + 80.0 * ((t as f64) * 0.9).sin() + ((t * 17) % 13) as f64)
            .collect();
        let selection = auto_arima(&series, &OrderSearch::default()).unwrap();
        let last = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let result = forecast_region("US", &series, last, &selection.best, 30, &[80.0, 95.0]).unwrap();

        assert_eq!(result.steps.len(), 30);
        assert_eq!(result.steps[0].date, NaiveDate::from_ymd_opt(2021, 3, 2).unwrap());
        assert_eq!(result.steps[29].date, NaiveDate::from_ymd_opt(2021, 3, 31).unwrap());

        let width = |i: usize, level: f64| result.steps[i].interval(level).unwrap().width();
        assert!(width(29, 95.0) >= width(0, 95.0));
        for w in result.steps.windows(2) {
            let a = w[0].interval(95.0).unwrap().width();
            let b = w[1].interval(95.0).unwrap().width();
            assert!(b >= a - 1e-9);
        }
        assert!(width(0, 95.0) > width(0, 80.0));
        assert!(result.steps.iter().all(|s| s.point.is_finite()));
    }

    #[test]
    fn invalid_level_is_config_error() {
        let fit = manual_fit(ArimaOrder::new(0, 1, 0), vec![], vec![], Some(0.0), vec![0.0; 3]);
        let last = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let err = forecast_region("US", &[1.0, 2.0, 3.0, 4.0], last, &fit, 2, &[150.0]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
