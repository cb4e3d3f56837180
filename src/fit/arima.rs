//! Conditional-sum-of-squares ARIMA fitting for a single order.
//!
//! With `w` the `d`-times differenced series and `x_t = w_t - μ`:
//!
//! ```text
//! x_t = φ_1 x_{t-1} + ... + φ_p x_{t-p} + e_t + θ_1 e_{t-1} + ... + θ_q e_{t-q}
//! ```
//!
//! Residuals are computed recursively from `start` with pre-sample residuals
//! set to zero. The start is shared across candidates so their likelihoods
//! cover the same observations.

use crate::domain::{ArimaCoefficients, ArimaFit, ArimaOrder, FitQuality};
use crate::error::AppError;
use crate::math::{
    NelderMead, ar_is_stationary, difference, lagged_regression, ma_is_invertible, mean, variance,
};

/// Minimum number of extra observations beyond parameter count.
pub const MIN_N_BUFFER: usize = 5;

/// Roots must clear the unit circle by this much.
const ROOT_MARGIN: f64 = 1e-3;

const SIGMA2_FLOOR: f64 = 1e-12;

/// Fit `order` to `series` conditioning on the first `condition_on` differenced samples.
///
/// `condition_on` is raised to `p` if smaller.
pub fn fit_arima(series: &[f64], order: ArimaOrder, condition_on: usize) -> Result<ArimaFit, AppError> {
    let w = difference(series, order.d);
    let start = condition_on.max(order.p);
    let k = order.param_count();

    let n_eff = w.len().saturating_sub(start);
    if n_eff < k + MIN_N_BUFFER {
        return Err(AppError::model_fit(format!(
            "{order} is underdetermined: n={n_eff} < k+{MIN_N_BUFFER}={}",
            k + MIN_N_BUFFER
        )));
    }

    let mu0 = if order.has_constant() { mean(&w) } else { 0.0 };
    let centered: Vec<f64> = w.iter().map(|v| v - mu0).collect();
    let (phi0, theta0) = admissible_start(&centered, order);

    let mut initial: Vec<f64> = phi0.into_iter().chain(theta0).collect();
    let mut steps = vec![0.1; initial.len()];
    if order.has_constant() {
        initial.push(mu0);
        steps.push(0.1 * variance(&w).sqrt() + 1e-3);
    }

    let objective = |params: &[f64]| -> f64 {
        let (phi, theta, mu) = split_params(params, order);
        if !ar_is_stationary(phi, ROOT_MARGIN) || !ma_is_invertible(theta, ROOT_MARGIN) {
            return f64::INFINITY;
        }
        let e = css_residuals(&w, phi, theta, mu, start);
        e[start..].iter().map(|r| r * r).sum()
    };

    let min = NelderMead::default().minimize(objective, &initial, &steps);
    if !min.value.is_finite() {
        return Err(AppError::model_fit(format!("{order} has no admissible parameters.")));
    }

    let (phi, theta, mu) = split_params(&min.x, order);
    let residuals = css_residuals(&w, phi, theta, mu, start);
    let quality = fit_quality(min.value, n_eff, k);

    tracing::debug!(%order, aicc = quality.aicc, evals = min.evals, "fitted candidate");

    Ok(ArimaFit {
        order,
        coefficients: ArimaCoefficients {
            ar: phi.to_vec(),
            ma: theta.to_vec(),
            mean: order.has_constant().then_some(mu),
        },
        quality,
        residuals,
    })
}

/// Information criteria from the conditional SSE.
pub fn fit_quality(sse: f64, n: usize, k: usize) -> FitQuality {
    let n_f = n as f64;
    let k_f = k as f64;
    let sigma2 = (sse / n_f).max(SIGMA2_FLOOR);
    let log_likelihood = -0.5 * n_f * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
    let aic = -2.0 * log_likelihood + 2.0 * k_f;
    let aicc = if n > k + 1 {
        aic + 2.0 * k_f * (k_f + 1.0) / (n_f - k_f - 1.0)
    } else {
        f64::INFINITY
    };
    let bic = -2.0 * log_likelihood + k_f * n_f.ln();
    FitQuality {
        sigma2,
        log_likelihood,
        aic,
        aicc,
        bic,
        n,
    }
}

/// Residuals of `w` under the given coefficients; zero before `start`.
pub fn css_residuals(w: &[f64], phi: &[f64], theta: &[f64], mu: f64, start: usize) -> Vec<f64> {
    let mut e = vec![0.0; w.len()];
    for t in start..w.len() {
        let mut pred = mu;
        for (i, a) in phi.iter().enumerate() {
            pred += a * (w[t - i - 1] - mu);
        }
        for (j, b) in theta.iter().enumerate() {
            if t > j {
                pred += b * e[t - j - 1];
            }
        }
        e[t] = w[t] - pred;
    }
    e
}

fn split_params(params: &[f64], order: ArimaOrder) -> (&[f64], &[f64], f64) {
    let (phi, rest) = params.split_at(order.p);
    let (theta, rest) = rest.split_at(order.q);
    (phi, theta, rest.first().copied().unwrap_or(0.0))
}

/// Hannan–Rissanen estimates, shrunk toward zero until admissible.
fn admissible_start(x: &[f64], order: ArimaOrder) -> (Vec<f64>, Vec<f64>) {
    let (mut phi, mut theta) = hannan_rissanen(x, order).unwrap_or_else(|| (vec![0.0; order.p], vec![0.0; order.q]));

    for _ in 0..20 {
        if ar_is_stationary(&phi, ROOT_MARGIN) && ma_is_invertible(&theta, ROOT_MARGIN) {
            return (phi, theta);
        }
        phi.iter_mut().for_each(|v| *v *= 0.5);
        theta.iter_mut().for_each(|v| *v *= 0.5);
    }
    (vec![0.0; order.p], vec![0.0; order.q])
}

/// Two-stage least squares: a long autoregression supplies residual
/// estimates, then `x_t` is regressed on its own lags and lagged residuals.
fn hannan_rissanen(x: &[f64], order: ArimaOrder) -> Option<(Vec<f64>, Vec<f64>)> {
    let (p, q) = (order.p, order.q);
    if p + q == 0 {
        return Some((Vec::new(), Vec::new()));
    }

    let n = x.len();
    let mut e_hat = vec![0.0; n];
    let mut first = p;
    if q > 0 {
        let long = (p.max(q) + 5).min(n / 4).max(1);
        let a = lagged_regression(x, long..n, long, |t, out| {
            for (i, v) in out.iter_mut().enumerate() {
                *v = x[t - i - 1];
            }
        })?;
        for t in long..n {
            let fitted: f64 = a.iter().enumerate().map(|(i, c)| c * x[t - i - 1]).sum();
            e_hat[t] = x[t] - fitted;
        }
        first = first.max(long + q);
    }

    let beta = lagged_regression(x, first..n, p + q, |t, out| {
        for i in 0..p {
            out[i] = x[t - i - 1];
        }
        for j in 0..q {
            out[p + j] = e_hat[t - j - 1];
        }
    })?;
    let (phi, theta) = beta.split_at(p);
    Some((phi.to_vec(), theta.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn simulate_ar1(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        let e = noise(n + 50, seed);
        let mut x = vec![0.0; n + 50];
        for t in 1..x.len() {
            x[t] = phi * x[t - 1] + e[t];
        }
        x.split_off(50)
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let x = simulate_ar1(0.6, 400, 7);
        let fit = fit_arima(&x, ArimaOrder::new(1, 0, 0), 1).unwrap();
        let phi = fit.coefficients.ar[0];
        assert!((phi - 0.6).abs() < 0.15, "phi={phi}");
        assert!(fit.coefficients.mean.is_some_and(|m| m.abs() < 0.5));
        assert!((fit.quality.sigma2 - 1.0).abs() < 0.3);
    }

    #[test]
    fn recovers_ma1_coefficient() {
        let e = noise(501, 11);
        let x: Vec<f64> = (1..e.len()).map(|t| e[t] + 0.5 * e[t - 1]).collect();
        let fit = fit_arima(&x, ArimaOrder::new(0, 0, 1), 0).unwrap();
        let theta = fit.coefficients.ma[0];
        assert!((theta - 0.5).abs() < 0.15, "theta={theta}");
    }

    #[test]
    fn second_difference_has_no_constant() {
        let x: Vec<f64> = (0..60).map(|t| (t * t) as f64 + (t % 3) as f64).collect();
        let fit = fit_arima(&x, ArimaOrder::new(0, 2, 1), 0).unwrap();
        assert!(fit.coefficients.mean.is_none());
        assert_eq!(fit.residuals.len(), 58);
    }

    #[test]
    fn fitted_parameters_are_admissible() {
        let x = simulate_ar1(0.95, 300, 3);
        let fit = fit_arima(&x, ArimaOrder::new(2, 0, 2), 2).unwrap();
        assert!(ar_is_stationary(&fit.coefficients.ar, 0.0));
        assert!(ma_is_invertible(&fit.coefficients.ma, 0.0));
    }

    #[test]
    fn spike_then_zeros_terminates_at_third_order_ma() {
        let mut x = vec![0.0; 30];
        x[0] = 5.0;
        // Only termination matters; the fit may or may not be admissible.
        let _ = fit_arima(&x, ArimaOrder::new(0, 0, 3), 0);
        let _ = fit_arima(&x, ArimaOrder::new(3, 0, 0), 3);
    }

    #[test]
    fn underdetermined_order_is_rejected() {
        let x = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 5.0, 8.0];
        let err = fit_arima(&x, ArimaOrder::new(2, 0, 2), 2).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ModelFit);
    }

    #[test]
    fn information_criteria_are_consistent() {
        let q = fit_quality(100.0, 100, 3);
        assert!((q.sigma2 - 1.0).abs() < 1e-12);
        assert!((q.aic - (-2.0 * q.log_likelihood + 6.0)).abs() < 1e-9);
        assert!(q.aicc > q.aic);
        assert!(q.bic > q.aic);
    }
}
