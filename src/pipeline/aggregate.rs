//! Weekly bucketing of raw rows and pair summary computation.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use crate::dataset::view::WindowSummary;
use crate::dataset::PulseData;
use crate::domain::week::round2;
use crate::domain::{EventRow, PairKey, PairSummary, WeekStats};

/// Weekly stat buckets for every pair, both maps in ascending order.
pub type WeekBuckets = BTreeMap<PairKey, BTreeMap<NaiveDate, WeekStats>>;

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// `len` consecutive Mondays, oldest first, ending with the week
/// containing `today`.
pub fn week_grid(today: NaiveDate, len: usize) -> Vec<NaiveDate> {
    let current = week_start(today);
    (0..len)
        .rev()
        .map(|i| current - Duration::weeks(i as i64))
        .collect()
}

/// Running totals for one (pair, week) bucket.
#[derive(Debug, Default)]
struct WeekAccum {
    goldstein_sum: f64,
    scored: u32,
    coop: u64,
    conf: u64,
    total: u64,
    mentions: u64,
}

impl WeekAccum {
    fn add(&mut self, row: &EventRow) {
        if let Some(score) = row.goldstein {
            self.goldstein_sum += score;
            self.scored += 1;
        }
        match row.quad() {
            Some(quad) if quad.is_cooperative() => self.coop += 1,
            Some(_) => self.conf += 1,
            None => {}
        }
        self.total += 1;
        self.mentions += row.mentions.unwrap_or(0);
    }

    fn into_stats(self, week: NaiveDate) -> WeekStats {
        let avg_goldstein =
            (self.scored > 0).then(|| round2(self.goldstein_sum / f64::from(self.scored)));
        WeekStats {
            week,
            avg_goldstein,
            coop: self.coop,
            conf: self.conf,
            total: self.total,
            mentions: self.mentions,
        }
    }
}

/// Group rows into per-pair weekly stats.
///
/// Events reported in either actor order land in the same bucket.
/// Rows without two distinct country codes, and rows whose date is
/// not a real calendar day, are skipped; the skip count is returned
/// alongside the buckets.
pub fn bucket_rows(rows: &[EventRow]) -> (WeekBuckets, usize) {
    let mut accums: BTreeMap<PairKey, BTreeMap<NaiveDate, WeekAccum>> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let (a1, a2) = match row.actor_codes() {
            Some(codes) => codes,
            None => {
                skipped += 1;
                continue;
            }
        };
        let week = match row.date() {
            Some(date) => week_start(date),
            None => {
                skipped += 1;
                continue;
            }
        };

        accums
            .entry(PairKey::new(a1, a2))
            .or_default()
            .entry(week)
            .or_default()
            .add(row);
    }

    if skipped > 0 {
        debug!(skipped, "skipped rows without a usable pair or date");
    }

    let buckets = accums
        .into_iter()
        .map(|(pair, weeks)| {
            let stats = weeks
                .into_iter()
                .map(|(week, accum)| (week, accum.into_stats(week)))
                .collect();
            (pair, stats)
        })
        .collect();

    (buckets, skipped)
}

/// Rebuild stat buckets from a previously published payload.
///
/// Only weeks with activity come back, so zero-filled grid padding
/// never shadows real data when new buckets are overlaid.
pub fn rebuild_buckets(existing: &PulseData) -> WeekBuckets {
    let mut buckets = WeekBuckets::new();
    for pair in &existing.pairs {
        let weeks: BTreeMap<NaiveDate, WeekStats> = pair
            .data
            .iter()
            .filter(|w| w.has_activity())
            .map(|w| (w.week, w.clone()))
            .collect();
        if !weeks.is_empty() {
            buckets.insert(pair.key(), weeks);
        }
    }
    buckets
}

/// Build the published summary for one pair over the week grid.
///
/// Weeks absent from `weekly` are zero-filled; weeks outside the grid
/// are dropped. Labels come from `countries`, falling back to the raw
/// code.
pub fn pair_summary(
    key: &PairKey,
    weekly: &BTreeMap<NaiveDate, WeekStats>,
    grid: &[NaiveDate],
    countries: &BTreeMap<String, String>,
) -> PairSummary {
    let (a1, a2) = key.codes();
    let name =
        |code: &str| countries.get(code).cloned().unwrap_or_else(|| code.to_string());

    let mut data = Vec::with_capacity(grid.len());
    for &week in grid {
        match weekly.get(&week) {
            Some(stats) => data.push(stats.clone()),
            None => data.push(WeekStats::empty(week)),
        }
    }

    let window = WindowSummary::compute(&data);

    PairSummary {
        actor1: a1.to_string(),
        actor2: a2.to_string(),
        label: format!("{} — {}", name(a1), name(a2)),
        total_events: window.total,
        recent_avg_goldstein: window.recent_avg_goldstein,
        trend: window.trend,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(
        sqldate: u32,
        a1: &str,
        a2: &str,
        goldstein: Option<f64>,
        quad: Option<u8>,
        mentions: u64,
    ) -> EventRow {
        EventRow {
            sqldate,
            actor1: Some(a1.to_string()).filter(|s| !s.is_empty()),
            actor2: Some(a2.to_string()).filter(|s| !s.is_empty()),
            goldstein,
            quad_class: quad,
            mentions: Some(mentions),
            avg_tone: None,
        }
    }

    #[test]
    fn test_week_start_snaps_to_monday() {
        // 2024-01-15 is a Monday
        assert_eq!(week_start(date(2024, 1, 15)), date(2024, 1, 15));
        // Wednesday and Sunday both map back to it
        assert_eq!(week_start(date(2024, 1, 17)), date(2024, 1, 15));
        assert_eq!(week_start(date(2024, 1, 21)), date(2024, 1, 15));
    }

    #[test]
    fn test_week_grid_is_ascending_and_ends_at_current_week() {
        let grid = week_grid(date(2024, 1, 17), 4);
        assert_eq!(
            grid,
            vec![
                date(2023, 12, 25),
                date(2024, 1, 1),
                date(2024, 1, 8),
                date(2024, 1, 15),
            ]
        );
    }

    #[test]
    fn test_bucket_rows_merges_both_directions() {
        let rows = vec![
            row(20240115, "USA", "CHN", Some(-3.0), Some(3), 5),
            row(20240115, "CHN", "USA", Some(2.0), Some(1), 3),
        ];

        let (buckets, skipped) = bucket_rows(&rows);
        assert_eq!(skipped, 0);
        assert_eq!(buckets.len(), 1);

        let weeks = &buckets[&PairKey::new("CHN", "USA")];
        let stats = &weeks[&date(2024, 1, 15)];
        assert_eq!(stats.total, 2);
        assert_eq!(stats.coop, 1);
        assert_eq!(stats.conf, 1);
        assert_eq!(stats.mentions, 8);
        assert_eq!(stats.avg_goldstein, Some(-0.5));
    }

    #[test]
    fn test_bucket_rows_weekly_stats() {
        let rows = vec![
            row(20240115, "USA", "CHN", Some(-5.0), Some(4), 10),
            row(20240116, "USA", "CHN", Some(3.0), Some(1), 5),
            row(20240117, "USA", "CHN", Some(-2.0), Some(3), 8),
        ];

        let (buckets, _) = bucket_rows(&rows);
        let stats = &buckets[&PairKey::new("CHN", "USA")][&date(2024, 1, 15)];
        assert_eq!(stats.total, 3);
        assert_eq!(stats.coop, 1);
        assert_eq!(stats.conf, 2);
        assert_eq!(stats.mentions, 23);
        assert_eq!(stats.avg_goldstein, Some(-1.33));
    }

    #[test]
    fn test_bucket_rows_unscored_week_has_no_average() {
        let rows = vec![row(20240115, "USA", "CHN", None, None, 2)];
        let (buckets, _) = bucket_rows(&rows);
        let stats = &buckets[&PairKey::new("CHN", "USA")][&date(2024, 1, 15)];
        assert_eq!(stats.avg_goldstein, None);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.coop, 0);
        assert_eq!(stats.conf, 0);
    }

    #[test]
    fn test_bucket_rows_skips_invalid() {
        let rows = vec![
            row(20240115, "", "CHN", Some(1.0), Some(1), 1),
            row(20240115, "USA", "USA", Some(1.0), Some(1), 1),
            row(20241399, "USA", "CHN", Some(1.0), Some(1), 1),
            row(20240115, "USA", "CHN", Some(1.0), Some(1), 1),
        ];

        let (buckets, skipped) = bucket_rows(&rows);
        assert_eq!(skipped, 3);
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn test_pair_summary_pads_grid_and_labels() {
        let mut weekly = BTreeMap::new();
        let mut active = WeekStats::empty(date(2024, 1, 8));
        active.total = 4;
        active.conf = 4;
        active.avg_goldstein = Some(-2.0);
        weekly.insert(active.week, active);

        let grid = vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)];
        let mut countries = BTreeMap::new();
        countries.insert("CHN".to_string(), "China".to_string());

        let summary = pair_summary(&PairKey::new("USA", "CHN"), &weekly, &grid, &countries);
        assert_eq!(summary.actor1, "CHN");
        assert_eq!(summary.actor2, "USA");
        assert_eq!(summary.label, "China — USA");
        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.data.len(), 3);
        assert!(!summary.data[0].has_activity());
        assert_eq!(summary.data[1].total, 4);
        assert_eq!(summary.recent_avg_goldstein, Some(-2.0));
        // A single scored window gives no trend
        assert_eq!(summary.trend, None);
    }

    #[test]
    fn test_pair_summary_drops_weeks_outside_grid() {
        let mut weekly = BTreeMap::new();
        for monday in [date(2020, 3, 2), date(2024, 1, 8)] {
            let mut stats = WeekStats::empty(monday);
            stats.total = 1;
            weekly.insert(monday, stats);
        }

        let grid = vec![date(2024, 1, 1), date(2024, 1, 8)];
        let summary =
            pair_summary(&PairKey::new("USA", "CHN"), &weekly, &grid, &BTreeMap::new());
        assert_eq!(summary.total_events, 1);
        assert_eq!(summary.data.len(), 2);
    }

    #[test]
    fn test_rebuild_buckets_keeps_only_active_weeks() {
        let grid = vec![date(2024, 1, 1), date(2024, 1, 8)];
        let mut weekly = BTreeMap::new();
        let mut active = WeekStats::empty(date(2024, 1, 8));
        active.total = 2;
        active.coop = 2;
        weekly.insert(active.week, active);

        let pair = pair_summary(&PairKey::new("USA", "CHN"), &weekly, &grid, &BTreeMap::new());
        assert_eq!(pair.data.len(), 2);

        let data = PulseData {
            generated_at: chrono::Utc::now(),
            weeks: grid,
            pairs: vec![pair],
            rankings: Default::default(),
            countries: Default::default(),
        };

        let buckets = rebuild_buckets(&data);
        let weeks = &buckets[&PairKey::new("CHN", "USA")];
        assert_eq!(weeks.len(), 1);
        assert!(weeks.contains_key(&date(2024, 1, 8)));
    }
}
