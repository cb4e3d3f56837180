//! ARIMA fitting orchestration.
//!
//! Responsibilities:
//!
//! - enumerate candidate orders
//! - fit each candidate by conditional sum of squares (parallel)
//! - select the best model by AICc with guardrails

pub mod arima;
pub mod order_grid;
pub mod selection;

pub use arima::*;
pub use order_grid::*;
pub use selection::*;
