//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and tidy table records (`RawSeriesTable`, `TidyRecord`, `JoinedRecord`)
//! - derived per-day records (`DailyRecord`, `SmoothedRecord`)
//! - model and forecast outputs (`ArimaFit`, `ForecastResult`)
//! - run configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
