//! Numerical building blocks: least squares, simplex search, lag-polynomial
//! roots and small statistics.

pub mod ols;
pub mod optimize;
pub mod poly;
pub mod stats;

pub use ols::*;
pub use optimize::{Minimum, NelderMead};
pub use poly::*;
pub use stats::*;
