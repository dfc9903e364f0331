//! The published pulse dataset.
//!
//! `PulseData` mirrors the JSON payload served to the dashboard:
//! a fixed week grid, the top pairs with their weekly history, the
//! pre-ranked category lists, and the country-name lookup table.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::fs;

use crate::domain::{PairKey, PairSummary};

/// Hours after which a payload counts as stale.
pub const STALE_AFTER_HOURS: i64 = 48;

/// The full payload as written by the pipeline and read by every
/// query surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseData {
    /// When the pipeline produced this payload.
    #[serde(with = "iso_seconds")]
    pub generated_at: DateTime<Utc>,

    /// Every Monday in the history grid, oldest first.
    pub weeks: Vec<NaiveDate>,

    /// Top pairs by event volume, each with its full weekly history.
    pub pairs: Vec<PairSummary>,

    /// Pre-ranked top lists, stored as pair keys.
    pub rankings: Rankings,

    /// Country code to display name, restricted to codes used by
    /// `pairs` and sorted by code.
    pub countries: BTreeMap<String, String>,
}

impl PulseData {
    /// Load a payload from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read payload: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse payload: {}", path.display()))
    }

    /// Write the payload to disk.
    ///
    /// The JSON lands in a temporary file in the destination directory
    /// first and is renamed into place, so readers never observe a
    /// half-written payload.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .await
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;

        let content = serde_json::to_vec(self).context("Failed to serialize payload")?;

        let mut tmp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(&content)
            .context("Failed to write payload to temp file")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to move payload into place: {}", path.display()))?;

        Ok(())
    }

    /// Look up a pair by key, in either actor order.
    pub fn find_pair(&self, key: &PairKey) -> Option<&PairSummary> {
        self.pairs.iter().find(|p| p.key() == *key)
    }

    /// The pairs for a ranking category, in rank order.
    ///
    /// Keys that no longer resolve to a stored pair are skipped.
    pub fn ranked_pairs(&self, category: RankCategory) -> Vec<&PairSummary> {
        self.rankings
            .get(category)
            .iter()
            .filter_map(|key| self.find_pair(key))
            .collect()
    }

    /// Display name for a country code, falling back to the code.
    pub fn country_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.countries.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Age of the payload relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.generated_at
    }

    /// Whether the payload is older than the staleness threshold.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > Duration::hours(STALE_AFTER_HOURS)
    }
}

/// Pre-ranked top lists, one per dashboard category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rankings {
    /// Lowest recent Goldstein average first.
    pub most_conflictual: Vec<PairKey>,
    /// Highest recent Goldstein average first.
    pub most_cooperative: Vec<PairKey>,
    /// Largest absolute trend first.
    pub biggest_shifts: Vec<PairKey>,
}

impl Rankings {
    /// The key list for one category.
    pub fn get(&self, category: RankCategory) -> &[PairKey] {
        match category {
            RankCategory::MostConflictual => &self.most_conflictual,
            RankCategory::MostCooperative => &self.most_cooperative,
            RankCategory::BiggestShifts => &self.biggest_shifts,
        }
    }
}

/// The three ranking categories in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankCategory {
    MostConflictual,
    MostCooperative,
    BiggestShifts,
}

impl RankCategory {
    pub const ALL: [RankCategory; 3] = [
        RankCategory::MostConflictual,
        RankCategory::MostCooperative,
        RankCategory::BiggestShifts,
    ];

    /// The payload field name for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            RankCategory::MostConflictual => "most_conflictual",
            RankCategory::MostCooperative => "most_cooperative",
            RankCategory::BiggestShifts => "biggest_shifts",
        }
    }
}

impl std::fmt::Display for RankCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `generated_at` wire format: RFC 3339 at second precision with a
/// `Z` suffix, e.g. `2024-01-15T06:00:00Z`.
pub(crate) mod iso_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
