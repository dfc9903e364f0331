//! Volume ranking and the pre-computed category lists.

use crate::dataset::pulse::Rankings;
use crate::domain::{PairKey, PairSummary};
use crate::pipeline::aggregate::WeekBuckets;

/// Entries kept per ranking category.
pub const RANK_SIZE: usize = 10;

/// Pair keys ordered by total event volume, highest first, truncated
/// to `limit`.
///
/// Ties keep the alphabetical bucket order, so the published pair
/// list is stable across runs.
pub fn top_pairs_by_volume(buckets: &WeekBuckets, limit: usize) -> Vec<PairKey> {
    let mut volumes: Vec<(&PairKey, u64)> = buckets
        .iter()
        .map(|(pair, weeks)| (pair, weeks.values().map(|w| w.total).sum()))
        .collect();

    volumes.sort_by(|a, b| b.1.cmp(&a.1));
    volumes
        .into_iter()
        .take(limit)
        .map(|(pair, _)| pair.clone())
        .collect()
}

/// The three ranked top lists over the published summaries.
///
/// Only pairs with a scored recent window rank at all, and
/// `biggest_shifts` additionally needs a trend. Ties keep the input
/// (volume) order.
pub fn rank_pairs(summaries: &[PairSummary]) -> Rankings {
    let with_recent: Vec<(f64, &PairSummary)> = summaries
        .iter()
        .filter_map(|p| p.recent_avg_goldstein.map(|avg| (avg, p)))
        .collect();

    let mut most_conflictual = with_recent.clone();
    most_conflictual.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut most_cooperative = with_recent.clone();
    most_cooperative.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut biggest_shifts: Vec<(f64, &PairSummary)> = with_recent
        .iter()
        .filter_map(|(_, p)| p.trend.map(|t| (t.abs(), *p)))
        .collect();
    biggest_shifts.sort_by(|a, b| b.0.total_cmp(&a.0));

    let keys = |ranked: &[(f64, &PairSummary)]| -> Vec<PairKey> {
        ranked.iter().take(RANK_SIZE).map(|(_, p)| p.key()).collect()
    };

    Rankings {
        most_conflictual: keys(&most_conflictual),
        most_cooperative: keys(&most_cooperative),
        biggest_shifts: keys(&biggest_shifts),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use crate::domain::WeekStats;

    use super::*;

    fn summary(a1: &str, a2: &str, recent: Option<f64>, trend: Option<f64>) -> PairSummary {
        PairSummary {
            actor1: a1.to_string(),
            actor2: a2.to_string(),
            label: format!("{} — {}", a1, a2),
            total_events: 0,
            recent_avg_goldstein: recent,
            trend,
            data: Vec::new(),
        }
    }

    fn bucket(total_per_week: &[u64]) -> BTreeMap<NaiveDate, WeekStats> {
        total_per_week
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::weeks(i as i64);
                let mut stats = WeekStats::empty(monday);
                stats.total = total;
                (monday, stats)
            })
            .collect()
    }

    #[test]
    fn test_top_pairs_order_and_limit() {
        let mut buckets = WeekBuckets::new();
        buckets.insert(PairKey::new("CHN", "USA"), bucket(&[3, 4]));
        buckets.insert(PairKey::new("RUS", "UKR"), bucket(&[10, 10]));
        buckets.insert(PairKey::new("DEU", "FRA"), bucket(&[1]));

        let top = top_pairs_by_volume(&buckets, 2);
        assert_eq!(top, vec![PairKey::new("RUS", "UKR"), PairKey::new("CHN", "USA")]);
    }

    #[test]
    fn test_top_pairs_ties_stay_alphabetical() {
        let mut buckets = WeekBuckets::new();
        buckets.insert(PairKey::new("RUS", "UKR"), bucket(&[5]));
        buckets.insert(PairKey::new("CHN", "USA"), bucket(&[5]));

        let top = top_pairs_by_volume(&buckets, 10);
        assert_eq!(top, vec![PairKey::new("CHN", "USA"), PairKey::new("RUS", "UKR")]);
    }

    #[test]
    fn test_rank_pairs_categories() {
        let summaries = vec![
            summary("A", "B", Some(-5.0), Some(-2.0)),
            summary("C", "D", Some(5.0), Some(0.5)),
            summary("E", "F", Some(0.0), Some(3.0)),
        ];

        let rankings = rank_pairs(&summaries);
        assert_eq!(rankings.most_conflictual[0].as_str(), "A-B");
        assert_eq!(rankings.most_cooperative[0].as_str(), "C-D");
        assert_eq!(rankings.biggest_shifts[0].as_str(), "E-F");
    }

    #[test]
    fn test_rank_pairs_excludes_unscored() {
        let summaries = vec![
            summary("A", "B", None, None),
            summary("C", "D", Some(1.0), None),
        ];

        let rankings = rank_pairs(&summaries);
        // Unscored pairs rank nowhere, trendless pairs skip shifts only
        assert_eq!(rankings.most_conflictual.len(), 1);
        assert_eq!(rankings.most_cooperative.len(), 1);
        assert!(rankings.biggest_shifts.is_empty());
    }

    #[test]
    fn test_rank_pairs_truncates_to_ten() {
        let summaries: Vec<PairSummary> = (0..15)
            .map(|i| {
                summary(
                    &format!("A{:02}", i),
                    &format!("B{:02}", i),
                    Some(f64::from(i)),
                    Some(0.1),
                )
            })
            .collect();

        let rankings = rank_pairs(&summaries);
        assert_eq!(rankings.most_conflictual.len(), RANK_SIZE);
        assert_eq!(rankings.most_conflictual[0].as_str(), "A00-B00");
        assert_eq!(rankings.most_cooperative[0].as_str(), "A14-B14");
    }

    #[test]
    fn test_rank_pairs_ties_keep_input_order() {
        let summaries = vec![
            summary("C", "D", Some(1.0), Some(0.5)),
            summary("A", "B", Some(1.0), Some(-0.5)),
        ];

        let rankings = rank_pairs(&summaries);
        assert_eq!(rankings.most_conflictual[0].as_str(), "C-D");
        assert_eq!(rankings.biggest_shifts[0].as_str(), "C-D");
    }
}
