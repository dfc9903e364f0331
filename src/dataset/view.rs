//! Read-side transforms behind the dashboard views.
//!
//! Everything here is pure and cheap enough to re-run on every
//! keystroke: filter pairs by country text, slice weekly series to a
//! range, and recompute the summary statistics that depend on what is
//! visible. Stored whole-history fields are never mutated; windowed
//! numbers live in [`WindowSummary`].

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::dataset::pulse::{PulseData, Rankings};
use crate::domain::week::{mean, round2};
use crate::domain::{PairKey, PairSummary, WeekStats};
use crate::format::color::{badge_color, goldstein_color, scale_stops, Rgb};
use crate::format::text::{format_goldstein, format_trend, time_ago, trend_direction};
use crate::pipeline::RECENT_WEEKS;

/// Weeks shown in a sparkline, about one year.
pub const SPARKLINE_WEEKS: usize = 52;

/// Trailing window of the smoothed Goldstein line.
pub const ROLLING_WINDOW_WEEKS: usize = 4;

/// Gradient stops in the exported color legend.
const LEGEND_STEPS: usize = 11;

/// Pairs whose actor codes or label contain `query`, case-insensitive.
///
/// An empty query keeps every pair. Input order is preserved.
pub fn filter_pairs<'a>(pairs: &'a [PairSummary], query: &str) -> Vec<&'a PairSummary> {
    if query.is_empty() {
        return pairs.iter().collect();
    }

    let needle = query.to_lowercase();
    pairs
        .iter()
        .filter(|p| {
            p.actor1.to_lowercase().contains(&needle)
                || p.actor2.to_lowercase().contains(&needle)
                || p.label.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Goldstein averages smoothed over a trailing window.
///
/// Entry `i` is the mean of the non-null averages in weeks
/// `i - window + 1 ..= i`, clipped at the start of the series, or
/// `None` when the whole window is unscored. One output entry per
/// input week.
pub fn rolling_goldstein(data: &[WeekStats], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..data.len())
        .map(|i| {
            let start = i.saturating_sub(window - 1);
            mean(data[start..=i].iter().filter_map(|w| w.avg_goldstein))
        })
        .collect()
}

/// Compact trace of the recent Goldstein averages for list rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sparkline {
    /// Weeks spanned; the x domain is `0..span`.
    pub span: usize,
    /// `(week_index, value)` for each scored week.
    pub points: Vec<(usize, f64)>,
    /// Stroke color, keyed on the most recent scored value.
    pub color: Rgb,
}

/// Sparkline over the last [`SPARKLINE_WEEKS`] of `data`.
///
/// Returns `None` when fewer than two of those weeks are scored; a
/// line needs two points.
pub fn sparkline(data: &[WeekStats]) -> Option<Sparkline> {
    let start = data.len().saturating_sub(SPARKLINE_WEEKS);
    let recent = &data[start..];

    let points: Vec<(usize, f64)> = recent
        .iter()
        .enumerate()
        .filter_map(|(i, w)| w.avg_goldstein.map(|v| (i, v)))
        .collect();

    if points.len() < 2 {
        return None;
    }

    let (_, last) = *points.last()?;
    Some(Sparkline {
        span: recent.len(),
        points,
        color: goldstein_color(last),
    })
}

/// Summary statistics recomputed over a visible slice of weeks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    /// Events inside the window.
    pub total: u64,
    /// Mean of the last [`RECENT_WEEKS`] weekly averages in the
    /// window, two decimals.
    pub recent_avg_goldstein: Option<f64>,
    /// Recent mean minus the mean of the [`RECENT_WEEKS`] before it,
    /// two decimals. `None` unless both windows have scored weeks.
    pub trend: Option<f64>,
    /// Week with the most conflictual events; the earliest on ties.
    pub peak_conflict: Option<WeekStats>,
    /// Week with the most cooperative events; the earliest on ties.
    pub peak_cooperation: Option<WeekStats>,
}

impl WindowSummary {
    pub fn compute(data: &[WeekStats]) -> Self {
        let total = data.iter().map(|w| w.total).sum();

        let recent_start = data.len().saturating_sub(RECENT_WEEKS);
        let prior_start = data.len().saturating_sub(2 * RECENT_WEEKS);
        let recent_avg = mean(data[recent_start..].iter().filter_map(|w| w.avg_goldstein));
        let prior_avg = mean(
            data[prior_start..recent_start]
                .iter()
                .filter_map(|w| w.avg_goldstein),
        );

        // The delta comes from the unrounded means
        let trend = match (recent_avg, prior_avg) {
            (Some(recent), Some(prior)) => Some(round2(recent - prior)),
            _ => None,
        };

        let mut peak_conflict: Option<&WeekStats> = None;
        let mut peak_cooperation: Option<&WeekStats> = None;
        for week in data.iter().filter(|w| w.has_activity()) {
            if peak_conflict.map_or(true, |best| week.conf > best.conf) {
                peak_conflict = Some(week);
            }
            if peak_cooperation.map_or(true, |best| week.coop > best.coop) {
                peak_cooperation = Some(week);
            }
        }

        Self {
            total,
            recent_avg_goldstein: recent_avg.map(round2),
            trend,
            peak_conflict: peak_conflict.cloned(),
            peak_cooperation: peak_cooperation.cloned(),
        }
    }
}

/// What a view should show: a country filter and a week range.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    /// Country text filter; `None` or empty keeps every pair.
    pub query: Option<String>,
    /// Inclusive week range; `None` keeps the whole grid.
    pub range: Option<(NaiveDate, NaiveDate)>,
}

impl ViewOptions {
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.range = Some((start, end));
        self
    }
}

/// Render-ready model for one pair under the current view options.
#[derive(Debug, Clone, Serialize)]
pub struct PairView {
    pub key: PairKey,
    pub label: String,
    /// Whole-history event count, as stored.
    pub total_events: u64,
    /// Stored recent average over the full grid.
    pub recent_avg_goldstein: Option<f64>,
    /// Stored trend over the full grid.
    pub trend: Option<f64>,
    pub badge_color: Rgb,
    pub avg_text: String,
    pub trend_text: String,
    pub trend_direction: &'static str,
    /// Statistics over the visible window only.
    pub window: WindowSummary,
    /// Smoothed Goldstein line for the visible weeks.
    pub rolling_goldstein: Vec<Option<f64>>,
    pub sparkline: Option<Sparkline>,
    /// The visible weekly rows.
    pub data: Vec<WeekStats>,
}

impl PairView {
    /// Build the view model for one (already sliced) pair summary.
    pub fn from_summary(pair: PairSummary) -> Self {
        let key = pair.key();
        let window = WindowSummary::compute(&pair.data);
        let rolling = rolling_goldstein(&pair.data, ROLLING_WINDOW_WEEKS);
        let spark = sparkline(&pair.data);

        Self {
            key,
            badge_color: badge_color(pair.recent_avg_goldstein),
            avg_text: format_goldstein(pair.recent_avg_goldstein),
            trend_text: format_trend(pair.trend),
            trend_direction: trend_direction(pair.trend),
            window,
            rolling_goldstein: rolling,
            sparkline: spark,
            label: pair.label,
            total_events: pair.total_events,
            recent_avg_goldstein: pair.recent_avg_goldstein,
            trend: pair.trend,
            data: pair.data,
        }
    }
}

/// Render-ready model for the whole dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct PulseView {
    #[serde(with = "crate::dataset::pulse::iso_seconds")]
    pub generated_at: DateTime<Utc>,
    pub age_text: String,
    pub stale: bool,
    /// The visible week grid.
    pub weeks: Vec<NaiveDate>,
    /// Pairs surviving the filter, payload order, each sliced to the
    /// visible range.
    pub pairs: Vec<PairView>,
    /// Ranking lists restricted to the surviving pairs, rank order.
    pub rankings: Rankings,
    /// `(value, color)` stops of the Goldstein legend.
    pub legend: Vec<(f64, Rgb)>,
}

impl PulseView {
    /// Assemble the dashboard view: filter, slice, recompute.
    pub fn build(data: &PulseData, opts: &ViewOptions, now: DateTime<Utc>) -> Self {
        let query = opts.query.as_deref().unwrap_or("");
        let kept = filter_pairs(&data.pairs, query);
        let kept_keys: BTreeSet<PairKey> = kept.iter().map(|p| p.key()).collect();

        let pairs: Vec<PairView> = kept
            .into_iter()
            .map(|p| {
                let sliced = match opts.range {
                    Some((start, end)) => p.slice(start, end),
                    None => p.clone(),
                };
                PairView::from_summary(sliced)
            })
            .collect();

        let keep_ranked = |keys: &[PairKey]| -> Vec<PairKey> {
            keys.iter()
                .filter(|k| kept_keys.contains(k))
                .cloned()
                .collect()
        };
        let rankings = Rankings {
            most_conflictual: keep_ranked(&data.rankings.most_conflictual),
            most_cooperative: keep_ranked(&data.rankings.most_cooperative),
            biggest_shifts: keep_ranked(&data.rankings.biggest_shifts),
        };

        let weeks = match opts.range {
            Some((start, end)) => data
                .weeks
                .iter()
                .copied()
                .filter(|w| *w >= start && *w <= end)
                .collect(),
            None => data.weeks.clone(),
        };

        Self {
            generated_at: data.generated_at,
            age_text: time_ago(data.generated_at, now),
            stale: data.is_stale(now),
            weeks,
            pairs,
            rankings,
            legend: scale_stops(LEGEND_STEPS),
        }
    }
}
