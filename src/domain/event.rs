//! Raw GDELT event rows as they arrive from export files.
//!
//! Field names match the GDELT 2.0 event table columns so that CSV and
//! JSON exports deserialize without a mapping step. Integer columns are
//! decoded leniently: BigQuery JSON exports encode INT64 values as
//! strings, CSV gives strings for everything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    /// Event date as a YYYYMMDD integer.
    #[serde(rename = "SQLDATE", deserialize_with = "de::u32_lenient")]
    pub sqldate: u32,

    /// CAMEO country code of the first actor.
    #[serde(rename = "Actor1CountryCode", default)]
    pub actor1: Option<String>,

    /// CAMEO country code of the second actor.
    #[serde(rename = "Actor2CountryCode", default)]
    pub actor2: Option<String>,

    /// Goldstein scale score for the event type, [-10, +10].
    #[serde(rename = "GoldsteinScale", default)]
    pub goldstein: Option<f64>,

    /// Quad class code (1-4), see [`QuadClass`].
    #[serde(rename = "QuadClass", default, deserialize_with = "de::opt_u8_lenient")]
    pub quad_class: Option<u8>,

    /// Number of source-document mentions.
    #[serde(rename = "NumMentions", default, deserialize_with = "de::opt_u64_lenient")]
    pub mentions: Option<u64>,

    /// Average tone of the mentioning documents.
    #[serde(rename = "AvgTone", default)]
    pub avg_tone: Option<f64>,
}

impl EventRow {
    /// Both actor codes, if the row names two distinct countries.
    ///
    /// Returns `None` for rows with a missing or empty code and for
    /// domestic (same-country) events, mirroring the source query filter.
    pub fn actor_codes(&self) -> Option<(&str, &str)> {
        let a1 = self.actor1.as_deref().filter(|s| !s.is_empty())?;
        let a2 = self.actor2.as_deref().filter(|s| !s.is_empty())?;
        if a1 == a2 {
            return None;
        }
        Some((a1, a2))
    }

    /// The event date, if `sqldate` encodes a real calendar day.
    pub fn date(&self) -> Option<NaiveDate> {
        let year = (self.sqldate / 10_000) as i32;
        let month = self.sqldate / 100 % 100;
        let day = self.sqldate % 100;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Typed quad class, `None` for absent or out-of-range codes.
    pub fn quad(&self) -> Option<QuadClass> {
        self.quad_class.and_then(QuadClass::from_code)
    }
}

/// The four GDELT event quad classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadClass {
    /// Code 1: statements of cooperation.
    VerbalCooperation,
    /// Code 2: material cooperation (aid, agreements).
    MaterialCooperation,
    /// Code 3: statements of conflict (threats, demands).
    VerbalConflict,
    /// Code 4: material conflict (force, coercion).
    MaterialConflict,
}

impl QuadClass {
    /// Map a raw quad class code to the typed variant.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::VerbalCooperation),
            2 => Some(Self::MaterialCooperation),
            3 => Some(Self::VerbalConflict),
            4 => Some(Self::MaterialConflict),
            _ => None,
        }
    }

    /// Codes 1 and 2.
    pub fn is_cooperative(self) -> bool {
        matches!(self, Self::VerbalCooperation | Self::MaterialCooperation)
    }

    /// Codes 3 and 4.
    pub fn is_conflictual(self) -> bool {
        !self.is_cooperative()
    }
}

/// Lenient integer decoding for export wire formats.
mod de {
    use std::fmt;

    use serde::de::{Deserializer, Error, Visitor};

    struct IntVisitor;

    impl<'de> Visitor<'de> for IntVisitor {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer, an integer-valued string, or null")
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v).map(Some).map_err(|_| E::custom("negative integer"))
        }

        fn visit_f64<E: Error>(self, v: f64) -> Result<Self::Value, E> {
            if v.fract() == 0.0 && v >= 0.0 && v <= u64::MAX as f64 {
                Ok(Some(v as u64))
            } else {
                Err(E::custom(format!("not an integer: {}", v)))
            }
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<u64>().map(Some).map_err(E::custom)
        }

        fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    pub fn opt_u64_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        d.deserialize_any(IntVisitor)
    }

    pub fn opt_u8_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
        match d.deserialize_any(IntVisitor)? {
            Some(v) => u8::try_from(v)
                .map(Some)
                .map_err(|_| D::Error::custom(format!("quad class out of range: {}", v))),
            None => Ok(None),
        }
    }

    pub fn u32_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        match d.deserialize_any(IntVisitor)? {
            Some(v) => u32::try_from(v)
                .map_err(|_| D::Error::custom(format!("date out of range: {}", v))),
            None => Err(D::Error::custom("missing event date")),
        }
    }
}
