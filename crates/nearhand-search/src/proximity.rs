//! Cheap "is this provider near the search point" test.
//!
//! An axis-aligned box of `threshold_degrees` on each side of the reference
//! point, not a geodesic distance. A degree of longitude shrinks toward the
//! poles, so the box is narrower on the ground at high latitudes; that
//! approximation is accepted for city-scale filtering.

use nearhand_core::Coordinate;

pub const DEFAULT_THRESHOLD_DEGREES: f64 = 0.5;

/// Returns `true` when both the latitude and the longitude deltas are
/// strictly below `threshold_degrees`. A missing coordinate on either side is
/// a non-match.
#[must_use]
pub fn is_near(a: Option<&Coordinate>, b: Option<&Coordinate>, threshold_degrees: f64) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    let lat_delta = (a.latitude() - b.latitude()).abs();
    let lon_delta = (a.longitude() - b.longitude()).abs();
    lat_delta < threshold_degrees && lon_delta < threshold_degrees
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityMatcher {
    threshold_degrees: f64,
}

impl Default for ProximityMatcher {
    fn default() -> Self {
        Self {
            threshold_degrees: DEFAULT_THRESHOLD_DEGREES,
        }
    }
}

impl ProximityMatcher {
    #[must_use]
    pub fn new(threshold_degrees: f64) -> Self {
        Self { threshold_degrees }
    }

    #[must_use]
    pub fn threshold_degrees(&self) -> f64 {
        self.threshold_degrees
    }

    #[must_use]
    pub fn is_near(&self, a: Option<&Coordinate>, b: Option<&Coordinate>) -> bool {
        is_near(a, b, self.threshold_degrees)
    }
}
