//! The aggregation pipeline: raw event rows to the published payload.
//!
//! `aggregate` buckets rows into weekly pair stats, `rank` orders
//! pairs and builds the category lists, and `build` orchestrates a
//! full or incremental publish.

pub mod aggregate;
pub mod build;
pub mod rank;

pub use build::{run, BuildMode, BuildOptions, BuildReport};

/// Pairs kept in the published payload, by total event volume.
pub const TOP_PAIRS: usize = 100;

/// Weeks in the payload history grid, about five years.
pub const WEEKS_HISTORY: usize = 260;

/// Width of the recent window used for averages and the trend delta.
pub const RECENT_WEEKS: usize = 12;
