//! Display formatting for pulse values.
//!
//! These are the rendering rules the dashboard uses, kept here so every
//! surface (tables, exports) prints the same strings.

use chrono::{DateTime, NaiveDate, Utc};

/// Format a count with thousands separators: 158420 becomes `158,420`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a Goldstein average with an explicit sign for positive
/// values: `+3.1`, `-2.3`, or `N/A` when no score exists.
pub fn format_goldstein(value: Option<f64>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(v) if v > 0.0 => format!("+{:.1}", v),
        Some(v) => format!("{:.1}", v),
    }
}

/// Format a trend delta as arrow plus magnitude: `↓ 0.8`, `↑ 1.2`,
/// `→ 0.0`, or an em dash when the trend is unknown.
pub fn format_trend(trend: Option<f64>) -> String {
    match trend {
        None => "—".to_string(),
        Some(t) => {
            let arrow = if t < 0.0 {
                "↓"
            } else if t > 0.0 {
                "↑"
            } else {
                "→"
            };
            format!("{} {:.1}", arrow, t.abs())
        }
    }
}

/// One-word reading of a trend delta. Positive deltas mean movement
/// toward cooperation.
pub fn trend_direction(trend: Option<f64>) -> &'static str {
    match trend {
        None => "",
        Some(t) if t < 0.0 => "worsening",
        Some(t) if t > 0.0 => "improving",
        Some(_) => "stable",
    }
}

/// Format a week date for display: `Jan 15, 2024`.
pub fn format_week(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Relative age of a timestamp: `just now`, `5h ago`, `3d ago`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - then).num_hours();
    if hours < 1 {
        return "just now".to_string();
    }
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}
