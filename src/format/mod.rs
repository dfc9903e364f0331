//! Presentation rules shared by every output surface.

pub mod color;
pub mod text;

pub use color::{badge_color, goldstein_color, scale_stops, Rgb};
pub use text::{
    format_count, format_goldstein, format_trend, format_week, time_ago, trend_direction,
};
