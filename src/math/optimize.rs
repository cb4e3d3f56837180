//! Derivative-free minimization (Nelder–Mead simplex).
//!
//! Used to refine ARIMA coefficients on the conditional sum of squares. The
//! objective may return `f64::INFINITY` to mark inadmissible points.

/// Nelder–Mead settings.
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    pub max_evals: usize,
    /// Relative spread of objective values at which the simplex is considered converged.
    pub f_tol: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_evals: 2_000,
            f_tol: 1e-10,
        }
    }
}

/// Best point found.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub evals: usize,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimize `f` starting at `start`; `steps[i]` sizes the initial simplex along axis `i`.
    pub fn minimize<F>(&self, mut f: F, start: &[f64], steps: &[f64]) -> Minimum
    where
        F: FnMut(&[f64]) -> f64,
    {
        let n = start.len();
        let mut evals = 0usize;
        let mut eval = |x: &[f64], evals: &mut usize| {
            *evals += 1;
            let v = f(x);
            if v.is_nan() { f64::INFINITY } else { v }
        };

        let f0 = eval(start, &mut evals);
        if n == 0 {
            return Minimum {
                x: Vec::new(),
                value: f0,
                evals,
            };
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), f0));
        for i in 0..n {
            let mut x = start.to_vec();
            x[i] += steps.get(i).copied().unwrap_or(0.1);
            let fx = eval(&x, &mut evals);
            simplex.push((x, fx));
        }

        while evals < self.max_evals {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[n].1;
            if best.is_finite() && worst.is_finite() && (worst - best).abs() <= self.f_tol * (best.abs() + self.f_tol) {
                break;
            }

            // Centroid of all points except the worst.
            let mut centroid = vec![0.0; n];
            for (x, _) in &simplex[..n] {
                for (c, v) in centroid.iter_mut().zip(x) {
                    *c += v / n as f64;
                }
            }

            let toward = |from: &[f64], to: &[f64], t: f64| -> Vec<f64> {
                from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
            };

            let worst_x = simplex[n].0.clone();
            let reflected = toward(&centroid, &worst_x, -REFLECT);
            let f_reflected = eval(&reflected, &mut evals);

            if f_reflected < best {
                let expanded = toward(&centroid, &worst_x, -EXPAND);
                let f_expanded = eval(&expanded, &mut evals);
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }

            if f_reflected < simplex[n - 1].1 {
                simplex[n] = (reflected, f_reflected);
                continue;
            }

            let (contracted, f_contracted, accept) = if f_reflected < worst {
                let x = toward(&centroid, &reflected, CONTRACT);
                let fx = eval(&x, &mut evals);
                let ok = fx <= f_reflected;
                (x, fx, ok)
            } else {
                let x = toward(&centroid, &worst_x, CONTRACT);
                let fx = eval(&x, &mut evals);
                let ok = fx < worst;
                (x, fx, ok)
            };

            if accept {
                simplex[n] = (contracted, f_contracted);
                continue;
            }

            let best_x = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let x = toward(&best_x, &vertex.0, SHRINK);
                let fx = eval(&x, &mut evals);
                *vertex = (x, fx);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (x, value) = simplex.swap_remove(0);
        Minimum { x, value, evals }
    }
}
