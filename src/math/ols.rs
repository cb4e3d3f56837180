//! Least squares solver.
//!
//! The Hannan–Rissanen start for ARIMA fitting solves two small regressions:
//!
//! ```text
//! minimize Σ (z_t - x_t^T β)^2
//! ```
//!
//! first for a long autoregression, then for the ARMA coefficients on lagged
//! values and lagged residual estimates.
//!
//! Implementation choices:
//! - SVD handles tall design matrices and degrades gracefully when lagged
//!   columns are nearly collinear (e.g. a slowly varying daily series).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Regress `y` on lagged columns built by `row`.
///
/// `row(t, out)` fills the design row for observation `t`; rows are built for
/// every `t` in `range`.
pub fn lagged_regression<F>(
    y: &[f64],
    range: std::ops::Range<usize>,
    cols: usize,
    mut row: F,
) -> Option<Vec<f64>>
where
    F: FnMut(usize, &mut [f64]),
{
    let n = range.len();
    if cols == 0 || n <= cols {
        return None;
    }

    let mut x = DMatrix::<f64>::zeros(n, cols);
    let mut target = DVector::<f64>::zeros(n);
    let mut buf = vec![0.0; cols];

    for (i, t) in range.enumerate() {
        row(t, &mut buf);
        for (j, v) in buf.iter().enumerate() {
            x[(i, j)] = *v;
        }
        target[i] = y[t];
    }

    solve_least_squares(&x, &target).map(|b| b.iter().copied().collect())
}
