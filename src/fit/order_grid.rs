//! ARIMA order grid.
//!
//! Orders for a fixed `d` are searched over `0..=max_p × 0..=max_q` with
//! `p + q <= max_order`. The grid is deterministic and ordered simplest
//! first (by `p + q`, then `p`), so an earlier entry wins an AICc tie.

use crate::domain::{ArimaOrder, OrderSearch};
use crate::error::{AppError, ErrorKind, Stage};

/// Largest differencing order the search will consider.
pub const MAX_DIFFERENCING: usize = 2;

/// Upper bound on `max_p` / `max_q`.
pub const MAX_LAG_ORDER: usize = 10;

pub fn validate_search(search: &OrderSearch) -> Result<(), AppError> {
    if search.max_p > MAX_LAG_ORDER || search.max_q > MAX_LAG_ORDER {
        return Err(AppError::new(
            ErrorKind::Config,
            Stage::Forecast,
            format!("max_p and max_q must be <= {MAX_LAG_ORDER}."),
        ));
    }
    if search.max_d > MAX_DIFFERENCING {
        return Err(AppError::new(
            ErrorKind::Config,
            Stage::Forecast,
            format!("max_d must be <= {MAX_DIFFERENCING}."),
        ));
    }
    Ok(())
}

/// All `(p, d, q)` candidates for one differencing order.
pub fn order_grid(search: &OrderSearch, d: usize) -> Vec<ArimaOrder> {
    let mut out = Vec::new();
    for p in 0..=search.max_p {
        for q in 0..=search.max_q {
            if p + q <= search.max_order {
                out.push(ArimaOrder::new(p, d, q));
            }
        }
    }
    out.sort_by_key(|o| (o.p + o.q, o.p));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_respects_total_order() {
        let grid = order_grid(&OrderSearch::default(), 1);
        // Pairs (p, q) with p, q <= 5 and p + q <= 5.
        assert_eq!(grid.len(), 21);
        assert!(grid.iter().all(|o| o.p + o.q <= 5 && o.d == 1));
    }

    #[test]
    fn grid_is_simplest_first() {
        let grid = order_grid(&OrderSearch::default(), 0);
        assert_eq!(grid[0], ArimaOrder::new(0, 0, 0));
        assert_eq!(grid[1], ArimaOrder::new(0, 0, 1));
        assert_eq!(grid[2], ArimaOrder::new(1, 0, 0));
        assert!(grid.windows(2).all(|w| w[0].p + w[0].q <= w[1].p + w[1].q));
    }

    #[test]
    fn rectangular_bounds_are_honored() {
        let search = OrderSearch {
            max_p: 1,
            max_q: 0,
            max_order: 5,
            max_d: 2,
        };
        let grid = order_grid(&search, 2);
        assert_eq!(grid, vec![ArimaOrder::new(0, 2, 0), ArimaOrder::new(1, 2, 0)]);
    }

    #[test]
    fn oversized_search_is_rejected() {
        let search = OrderSearch {
            max_d: 3,
            ..OrderSearch::default()
        };
        let err = validate_search(&search).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
