//! `epi-trends` library crate.
//!
//! The binary (`epi`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - loading, transforms and forecasting are reusable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod transform;
pub mod tui;
