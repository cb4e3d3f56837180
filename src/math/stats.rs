//! Small descriptive statistics and the KPSS stationarity statistic.

use statrs::distribution::{ContinuousCDF, Normal};

/// 5% critical value of the KPSS level-stationarity test.
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Population variance (`/ n`).
pub fn variance(x: &[f64]) -> f64 {
    let m = mean(x);
    x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / x.len() as f64
}

/// `order`-th difference of `x`.
pub fn difference(x: &[f64], order: usize) -> Vec<f64> {
    let mut out = x.to_vec();
    for _ in 0..order {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// True when the series has no meaningful variation.
pub fn is_constant(x: &[f64]) -> bool {
    let (min, max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let scale = min.abs().max(max.abs()).max(1.0);
    !(max - min > 1e-10 * scale)
}

/// KPSS statistic for level stationarity.
///
/// Uses the Bartlett-weighted long-run variance with the short lag
/// `⌊4 (n/100)^{1/4}⌋`. Returns `None` when the series is too short or its
/// long-run variance vanishes (e.g. a constant series).
pub fn kpss_level_statistic(x: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 3 {
        return None;
    }
    let m = mean(x);
    let e: Vec<f64> = x.iter().map(|v| v - m).collect();

    let mut partial = 0.0;
    let mut sum_sq_partial = 0.0;
    for v in &e {
        partial += v;
        sum_sq_partial += partial * partial;
    }

    let lags = ((4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize).min(n - 1);
    let n_f = n as f64;
    let autocov = |lag: usize| -> f64 { (lag..n).map(|t| e[t] * e[t - lag]).sum::<f64>() / n_f };

    let mut long_run = autocov(0);
    for lag in 1..=lags {
        let weight = 1.0 - lag as f64 / (lags as f64 + 1.0);
        long_run += 2.0 * weight * autocov(lag);
    }

    let scale = 1.0 + m * m;
    if !(long_run.is_finite() && long_run > f64::EPSILON * scale) {
        return None;
    }

    Some(sum_sq_partial / (n_f * n_f * long_run))
}

/// Two-sided standard normal quantile for a `level` percent interval.
///
/// `normal_quantile_for_level(95.0) ≈ 1.96`. `None` for levels outside (0, 100).
pub fn normal_quantile_for_level(level: f64) -> Option<f64> {
    if !(level > 0.0 && level < 100.0) {
        return None;
    }
    let normal = Normal::new(0.0, 1.0).ok()?;
    Some(normal.inverse_cdf(0.5 + level / 200.0))
}
