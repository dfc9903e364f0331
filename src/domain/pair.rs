//! Country pairs and their aggregated summaries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::week::WeekStats;

/// Canonical identifier for an unordered country pair, e.g. `CHN-USA`.
///
/// The two CAMEO codes are stored in alphabetical order so that events
/// reported as (USA, CHN) and (CHN, USA) land under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
    /// Build the canonical key from two actor codes, in either order.
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(format!("{}-{}", a, b))
        } else {
            Self(format!("{}-{}", b, a))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two codes in canonical (alphabetical) order.
    pub fn codes(&self) -> (&str, &str) {
        // Keys built by `new` or parsed always contain the separator
        self.0.split_once('-').unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PairKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-').map(|(a, b)| (a.trim(), b.trim())) {
            Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok(Self::new(a, b)),
            _ => anyhow::bail!("invalid pair key '{}', expected CODE-CODE", s),
        }
    }
}

/// Aggregated history for one country pair as published in the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSummary {
    /// First actor code in canonical order.
    pub actor1: String,
    /// Second actor code in canonical order.
    pub actor2: String,
    /// Human-readable label, e.g. `China — United States`.
    pub label: String,
    /// Events across the whole stored history.
    pub total_events: u64,
    /// Mean Goldstein score over the recent window, two decimals.
    pub recent_avg_goldstein: Option<f64>,
    /// Recent-window average minus the prior window's, two decimals.
    /// Positive values mean movement toward cooperation.
    pub trend: Option<f64>,
    /// One entry per week of the stored grid, oldest first.
    pub data: Vec<WeekStats>,
}

impl PairSummary {
    /// The canonical key for this pair.
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.actor1, &self.actor2)
    }

    /// Copy of this summary restricted to weeks in `[start, end]`.
    ///
    /// Only `data` changes. The stored whole-history fields keep their
    /// values, window statistics are recomputed by the caller.
    pub fn slice(&self, start: chrono::NaiveDate, end: chrono::NaiveDate) -> Self {
        let mut sliced = self.clone();
        sliced.data.retain(|w| w.week >= start && w.week <= end);
        sliced
    }
}
