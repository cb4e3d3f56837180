//! Per-region transforms over the joined table.
//!
//! - allow-list filtering + first differences (`aggregate`)
//! - trailing moving average (`smooth`)

pub mod aggregate;
pub mod smooth;

pub use aggregate::{daily_case_series, daily_counts};
pub use smooth::smooth_daily_cases;
