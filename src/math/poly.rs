//! Lag-polynomial root checks.
//!
//! `1 - a_1 z - ... - a_k z^k` has all roots outside the unit circle exactly
//! when the companion matrix of `a` has spectral radius below one.

use nalgebra::DMatrix;
use nalgebra::linalg::Schur;

/// QR sweeps allowed before the Schur decomposition gives up.
const SCHUR_MAX_ITERS: usize = 1000;

/// Largest eigenvalue modulus of the companion matrix for `coeffs`.
///
/// `None` if any coefficient is non-finite or the eigenvalues do not converge.
pub fn companion_spectral_radius(coeffs: &[f64]) -> Option<f64> {
    if coeffs.iter().any(|c| !c.is_finite()) {
        return None;
    }
    // All-zero coefficients give a nilpotent companion matrix.
    if coeffs.iter().all(|c| *c == 0.0) {
        return Some(0.0);
    }
    match coeffs.len() {
        0 => Some(0.0),
        1 => Some(coeffs[0].abs()),
        k => {
            let mut m = DMatrix::<f64>::zeros(k, k);
            for (j, c) in coeffs.iter().enumerate() {
                m[(0, j)] = *c;
            }
            for i in 1..k {
                m[(i, i - 1)] = 1.0;
            }
            let radius = Schur::try_new(m, f64::EPSILON, SCHUR_MAX_ITERS)?
                .complex_eigenvalues()
                .iter()
                .map(|z| z.norm())
                .fold(0.0_f64, f64::max);
            radius.is_finite().then_some(radius)
        }
    }
}

/// `φ(B) = 1 - φ_1 B - ... - φ_p B^p` is stationary with `margin` to spare.
pub fn ar_is_stationary(phi: &[f64], margin: f64) -> bool {
    companion_spectral_radius(phi).is_some_and(|r| r < 1.0 - margin)
}

/// `θ(B) = 1 + θ_1 B + ... + θ_q B^q` is invertible with `margin` to spare.
pub fn ma_is_invertible(theta: &[f64], margin: f64) -> bool {
    let negated: Vec<f64> = theta.iter().map(|t| -t).collect();
    companion_spectral_radius(&negated).is_some_and(|r| r < 1.0 - margin)
}
