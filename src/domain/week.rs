//! Per-week aggregate statistics for a country pair.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregated event counts for one pair in one ISO week.
///
/// `week` is the Monday the week starts on. Serialized dates use the
/// `YYYY-MM-DD` form, so string order matches chronological order in
/// the published payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekStats {
    /// Monday of the week.
    pub week: NaiveDate,
    /// Mean Goldstein score across the week's events, rounded to two
    /// decimals. `None` when no event carried a score.
    pub avg_goldstein: Option<f64>,
    /// Events with quad class 1 or 2.
    pub coop: u64,
    /// Events with quad class 3 or 4.
    pub conf: u64,
    /// All events, including those with no usable quad class.
    pub total: u64,
    /// Summed source-document mentions.
    pub mentions: u64,
}

impl WeekStats {
    /// A zero-filled entry used to pad quiet weeks in the grid.
    pub fn empty(week: NaiveDate) -> Self {
        Self {
            week,
            avg_goldstein: None,
            coop: 0,
            conf: 0,
            total: 0,
            mentions: 0,
        }
    }

    /// Whether any event landed in this week.
    pub fn has_activity(&self) -> bool {
        self.total > 0
    }
}

/// Round a score to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of a sequence of scores, `None` when empty.
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u32;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / f64::from(count))
}
