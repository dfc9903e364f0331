//! The published dataset and its read-side views.

pub mod pulse;
pub mod view;

pub use pulse::{PulseData, RankCategory, Rankings, STALE_AFTER_HOURS};
pub use view::{
    filter_pairs, rolling_goldstein, sparkline, PairView, PulseView, Sparkline, ViewOptions,
    WindowSummary,
};
