//! Forecasting from fitted ARIMA models.

pub mod forecast;

pub use forecast::*;
