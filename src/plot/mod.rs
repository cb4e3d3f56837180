//! Terminal charts.

pub mod ascii;

pub use ascii::*;
