//! Data acquisition and table shaping.
//!
//! - remote CSV loading (`source`)
//! - offline synthetic tables (`sample`)
//! - wide → long reshaping (`reshape`)
//! - cases/deaths join (`merge`)

pub mod merge;
pub mod reshape;
pub mod sample;
pub mod source;

pub use merge::join;
pub use reshape::reshape;
pub use sample::{SAMPLE_DAYS, sample_tables};
pub use source::{SourceClient, parse_table};
