use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TouristError;

/// How far a search reaches around a coordinate.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precision {
    Meter,
    TenMeter,
    HundredMeter,
    Kilometer,
    TenKilometer,
}

impl Precision {
    pub const ALL: [Precision; 5] = [
        Precision::Meter,
        Precision::TenMeter,
        Precision::HundredMeter,
        Precision::Kilometer,
        Precision::TenKilometer,
    ];

    /// Half the side of the box, in degrees.
    pub fn half_width(self) -> f64 {
        match self {
            Precision::Meter => 0.00001,
            Precision::TenMeter => 0.0001,
            Precision::HundredMeter => 0.001,
            Precision::Kilometer => 0.01,
            Precision::TenKilometer => 0.1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Precision::Meter => "meter",
            Precision::TenMeter => "ten-meter",
            Precision::HundredMeter => "hundred-meter",
            Precision::Kilometer => "kilometer",
            Precision::TenKilometer => "ten-kilometer",
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Kilometer
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Precision {
    type Err = TouristError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Precision::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| TouristError::BadRequest(format!("unknown precision {:?}", s)))
    }
}

/// A search box around a coordinate. Nothing is clamped or wrapped:
/// a pin near a pole or the antimeridian produces a box that pokes
/// past it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub min_latitude: f64,
    pub max_longitude: f64,
    pub max_latitude: f64,
}

impl BoundingBox {
    pub fn new(latitude: f64, longitude: f64, precision: Precision) -> Result<Self, TouristError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(TouristError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        let half_width = precision.half_width();

        Ok(BoundingBox {
            min_longitude: longitude - half_width,
            min_latitude: latitude - half_width,
            max_longitude: longitude + half_width,
            max_latitude: latitude + half_width,
        })
    }
}

/// Formats as `minLon,minLat,maxLon,maxLat`, the order the search API
/// expects.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_longitude, self.min_latitude, self.max_longitude, self.max_latitude
        )
    }
}

/// Returns the `bbox` query value for a coordinate.
///
/// ```
/// use tourist::geo::{compute_bounding_box, Precision};
/// let bbox = compute_bounding_box(50.0, 33.0, Precision::TenKilometer).unwrap();
/// assert_eq!(bbox, "32.9,49.9,33.1,50.1");
/// ```
pub fn compute_bounding_box(
    latitude: f64,
    longitude: f64,
    precision: Precision,
) -> Result<String, TouristError> {
    BoundingBox::new(latitude, longitude, precision).map(|b| b.to_string())
}
