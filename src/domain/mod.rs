//! Domain types for the geopulse dataset.
//!
//! This module contains the core data structures:
//! - EventRow: raw GDELT export records
//! - WeekStats: per-week aggregates for a pair
//! - PairKey / PairSummary: canonical pair identity and history

pub mod event;
pub mod pair;
pub mod week;

// Re-export commonly used types
pub use event::{EventRow, QuadClass};
pub use pair::{PairKey, PairSummary};
pub use week::WeekStats;
