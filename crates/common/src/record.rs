//! Location analysis records

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Timestamp layout used in the results table (second precision, local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A point inside the satellite image as percentages of its width and height,
/// origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    /// Image centre, used whenever no usable pair was reported
    pub const CENTER: Coordinates = Coordinates { x: 50.0, y: 50.0 };

    /// Build a pair with each axis clamped to [0, 100]; `-0.0` becomes `0.0`
    #[must_use]
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(Self::MIN, Self::MAX) + 0.0,
            y: y.clamp(Self::MIN, Self::MAX) + 0.0,
        }
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::CENTER
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Error returned when text is not an `x,y` pair of finite numbers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid coordinate pair: {0:?}")]
pub struct ParseCoordinatesError(pub String);

impl FromStr for Coordinates {
    type Err = ParseCoordinatesError;

    /// Parse `x,y`; surrounding whitespace on either number is ignored.
    /// Values are taken as-is, not clamped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCoordinatesError(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        if y.contains(',') {
            return Err(invalid());
        }
        let x: f64 = x.trim().parse().map_err(|_| invalid())?;
        let y: f64 = y.trim().parse().map_err(|_| invalid())?;
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid());
        }
        Ok(Self { x, y })
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One persisted location analysis.
///
/// Field names on the wire match the results table columns, so the same value
/// serializes to a CSV row and to the JSON returned by the read endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "UUID")]
    pub uuid: String,

    #[serde(rename = "Video Path")]
    pub video_path: PathBuf,

    #[serde(rename = "Image Path")]
    pub image_path: PathBuf,

    /// Full text reply of the vision model
    #[serde(rename = "Location Description")]
    pub description: String,

    #[serde(rename = "Coordinates")]
    pub coordinates: Coordinates,

    #[serde(rename = "Confidence Score")]
    pub confidence: u8,

    #[serde(rename = "Timestamp", with = "timestamp")]
    pub created_at: NaiveDateTime,
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
