//! Diverging color scale for Goldstein values.
//!
//! Red for conflict (negative), through neutral, to blue for
//! cooperation (positive). The ramp interpolates linearly between the
//! eleven ColorBrewer RdBu stops.

use std::fmt;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase hex form, e.g. `#f4a582`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            anyhow::bail!("invalid color '{}', expected #rrggbb", s);
        }
        let channel = |range| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| anyhow::anyhow!("invalid color '{}', expected #rrggbb", s))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

// Colors travel as hex strings in JSON view models.
impl serde::Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Badge color for pairs with no scored events.
const NEUTRAL_GREY: Rgb = Rgb::new(0x99, 0x99, 0x99);

/// ColorBrewer RdBu, 11 classes, red first.
const RDBU: [Rgb; 11] = [
    Rgb::new(0x67, 0x00, 0x1f),
    Rgb::new(0xb2, 0x18, 0x2b),
    Rgb::new(0xd6, 0x60, 0x4d),
    Rgb::new(0xf4, 0xa5, 0x82),
    Rgb::new(0xfd, 0xdb, 0xc7),
    Rgb::new(0xf7, 0xf7, 0xf7),
    Rgb::new(0xd1, 0xe5, 0xf0),
    Rgb::new(0x92, 0xc5, 0xde),
    Rgb::new(0x43, 0x93, 0xc3),
    Rgb::new(0x21, 0x66, 0xac),
    Rgb::new(0x05, 0x30, 0x61),
];

/// Bounds of the Goldstein scale.
pub const GOLDSTEIN_MIN: f64 = -10.0;
pub const GOLDSTEIN_MAX: f64 = 10.0;

fn lerp(a: u8, b: u8, frac: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * frac).round() as u8
}

/// Sample the RdBu ramp at `t` in `[0, 1]`. Out-of-range inputs clamp.
fn ramp(t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (RDBU.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(RDBU.len() - 2);
    let frac = scaled - i as f64;
    let (lo, hi) = (RDBU[i], RDBU[i + 1]);
    Rgb::new(
        lerp(lo.r, hi.r, frac),
        lerp(lo.g, hi.g, frac),
        lerp(lo.b, hi.b, frac),
    )
}

/// Color for a Goldstein value. Values outside `[-10, +10]` clamp to
/// the scale ends.
pub fn goldstein_color(value: f64) -> Rgb {
    let t = (value - GOLDSTEIN_MIN) / (GOLDSTEIN_MAX - GOLDSTEIN_MIN);
    ramp(t)
}

/// Badge color for an optional Goldstein average, grey when absent.
pub fn badge_color(value: Option<f64>) -> Rgb {
    match value {
        Some(v) => goldstein_color(v),
        None => NEUTRAL_GREY,
    }
}

/// Evenly spaced `(value, color)` stops across the scale, for legends.
pub fn scale_stops(steps: usize) -> Vec<(f64, Rgb)> {
    match steps {
        0 => Vec::new(),
        1 => vec![(GOLDSTEIN_MIN, goldstein_color(GOLDSTEIN_MIN))],
        _ => (0..steps)
            .map(|i| {
                let value = GOLDSTEIN_MIN
                    + (GOLDSTEIN_MAX - GOLDSTEIN_MIN) * i as f64 / (steps - 1) as f64;
                (value, goldstein_color(value))
            })
            .collect(),
    }
}
