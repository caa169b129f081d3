//! Coordinates and the parsed form of the search box's location field.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid coordinate (latitude {latitude}, longitude {longitude}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
pub struct CoordinateError {
    pub latitude: f64,
    pub longitude: f64,
}

/// A validated WGS84 position in decimal degrees.
///
/// The only way to obtain one is through [`Coordinate::new`] (or
/// deserialization, which goes through the same check), so every value in
/// circulation is finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Validates and builds a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when either component is NaN, infinite, or
    /// outside its valid range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if is_valid_latitude(latitude) && is_valid_longitude(longitude) {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(CoordinateError {
                latitude,
                longitude,
            })
        }
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Human-readable label used when no place name is available.
    ///
    /// The output is accepted by [`LocationQuery::parse`] as a coordinate.
    #[must_use]
    pub fn near_label(&self) -> String {
        format!(
            "Near Lat: {:.2}, Lon: {:.2}",
            self.latitude, self.longitude
        )
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

#[must_use]
pub fn is_valid_latitude(latitude: f64) -> bool {
    latitude.is_finite() && (-90.0..=90.0).contains(&latitude)
}

#[must_use]
pub fn is_valid_longitude(longitude: f64) -> bool {
    longitude.is_finite() && (-180.0..=180.0).contains(&longitude)
}

/// What the user asked for in the location box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocationQuery {
    #[default]
    Unspecified,
    Online,
    Coordinate(Coordinate),
    TextLabel(String),
}

fn near_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)near\s+lat:\s*([-+]?\d+(?:\.\d+)?)\s*,\s*lon:\s*([-+]?\d+(?:\.\d+)?)")
            .expect("valid regex")
    })
}

/// Extracts the numbers from a `Near Lat: <lat>, Lon: <lon>` string without
/// range-checking them. The pattern may appear anywhere in `raw`.
fn match_near_pattern(raw: &str) -> Option<(f64, f64)> {
    let caps = near_pattern().captures(raw)?;
    let latitude = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let longitude = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some((latitude, longitude))
}

impl LocationQuery {
    /// Parses the raw location box contents. Total: every input maps to
    /// exactly one variant.
    ///
    /// A `Near Lat/Lon` string whose numbers are out of range is kept as a
    /// [`LocationQuery::TextLabel`]; use [`LocationQuery::parse_strict`] to
    /// reject it instead.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::parse_strict(raw).unwrap_or_else(|_| Self::TextLabel(raw.trim().to_owned()))
    }

    /// Like [`LocationQuery::parse`] but refuses a coordinate-shaped input
    /// whose values are out of range.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] for a `Near Lat/Lon` string with an invalid
    /// latitude or longitude.
    pub fn parse_strict(raw: &str) -> Result<Self, CoordinateError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::Unspecified);
        }
        if let Some((latitude, longitude)) = match_near_pattern(trimmed) {
            return Coordinate::new(latitude, longitude).map(Self::Coordinate);
        }
        if trimmed.eq_ignore_ascii_case("online") {
            return Ok(Self::Online);
        }
        Ok(Self::TextLabel(trimmed.to_owned()))
    }

    /// The string form written back into the search box / URL.
    #[must_use]
    pub fn to_raw(&self) -> String {
        match self {
            Self::Unspecified => String::new(),
            Self::Online => "Online".to_owned(),
            Self::Coordinate(c) => format!(
                "Near Lat: {}, Lon: {}",
                c.latitude(),
                c.longitude()
            ),
            Self::TextLabel(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Coordinate(c) => Some(*c),
            _ => None,
        }
    }
}
