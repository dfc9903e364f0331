//! geopulse - Conflict/cooperation pulse over GDELT event data
//!
//! Aggregates country-pair event exports into a weekly payload and
//! renders dashboard-ready views of it.
//!
//! # Architecture
//!
//! The pipeline is a pure transform over event rows:
//! - Rows are bucketed into per-pair weekly stats
//! - The top pairs by total volume are kept, ranked, and labeled
//! - The payload is written atomically, guarded by a build lock
//!
//! Incremental builds reload the published payload, overlay the new
//! weekly buckets, and re-rank, so re-running over the same rows is
//! idempotent.
//!
//! # Modules
//!
//! - `sources`: Event row readers (CSV, TSV, JSONL exports)
//! - `pipeline`: Aggregation, ranking, and payload builds
//! - `dataset`: The published payload and dashboard views over it
//! - `domain`: Data structures (EventRow, PairSummary, WeekStats)
//! - `format`: Number, date, and color formatting
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Merge a day of exports into the payload
//! geopulse build exports/*.csv
//!
//! # Show the most conflictual pairs
//! geopulse top --category conflict
//!
//! # Inspect one pair
//! geopulse show USA-CHN
//! ```

pub mod cli;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod format;
pub mod pipeline;
pub mod sources;

// Re-export main types at crate root for convenience
pub use dataset::{PulseData, PulseView, RankCategory, Rankings, ViewOptions};
pub use domain::{EventRow, PairKey, PairSummary, QuadClass, WeekStats};
pub use pipeline::{BuildMode, BuildOptions, BuildReport};
pub use sources::{EventSource, SourceError};
