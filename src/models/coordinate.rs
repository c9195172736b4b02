//! Coordinates, datums and sample points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HazardError;

/// Geodetic reference frame of an input coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Datum {
    #[default]
    Wgs84,
    /// Tokyo Datum (the pre-2002 Japanese geodetic system)
    Tokyo,
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Wgs84 => write!(f, "wgs84"),
            Datum::Tokyo => write!(f, "tokyo"),
        }
    }
}

impl FromStr for Datum {
    type Err = HazardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wgs84" => Ok(Datum::Wgs84),
            "tokyo" => Ok(Datum::Tokyo),
            other => Err(HazardError::InvalidInput(format!(
                "datum must be either \"wgs84\" or \"tokyo\", got \"{}\"",
                other
            ))),
        }
    }
}

/// An immutable geographic coordinate tagged with its datum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
    pub datum: Datum,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64, datum: Datum) -> Self {
        Self { lat, lon, datum }
    }

    pub fn wgs84(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, Datum::Wgs84)
    }

    /// Normalize to WGS84, the only datum used for geometry.
    ///
    /// Tokyo Datum coordinates go through the usual three-parameter affine
    /// approximation, good to a few meters across Japan.
    pub fn to_wgs84(self) -> Self {
        match self.datum {
            Datum::Wgs84 => self,
            Datum::Tokyo => {
                let (lat, lon) = (self.lat, self.lon);
                Self::wgs84(
                    lat + 0.00010695 * lat - 0.000017464 * lon - 0.0046017,
                    lon + 0.000046038 * lat + 0.000083043 * lon - 0.010040,
                )
            }
        }
    }

    /// Express a WGS84 coordinate in Tokyo Datum.
    pub fn to_tokyo(self) -> Self {
        match self.datum {
            Datum::Tokyo => self,
            Datum::Wgs84 => {
                let (lat, lon) = (self.lat, self.lon);
                Self::new(
                    lat - 0.00010695 * lat + 0.000017464 * lon + 0.0046017,
                    lon - 0.000046038 * lat - 0.000083043 * lon + 0.010040,
                    Datum::Tokyo,
                )
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Request-level tradeoff between sample density and latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Center plus eight one-pixel neighbours
    #[default]
    Low,
    /// Center plus two rings out to roughly 100 m, with a secondary-layer fallback
    High,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Low => write!(f, "low"),
            Precision::High => write!(f, "high"),
        }
    }
}

impl FromStr for Precision {
    type Err = HazardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Precision::Low),
            "high" => Ok(Precision::High),
            other => Err(HazardError::InvalidInput(format!(
                "precision must be either \"low\" or \"high\", got \"{}\"",
                other
            ))),
        }
    }
}

/// Why a sample point exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleRole {
    Center,
    Directional,
    Ring,
}

/// One point sampled for a request. Always WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub lat: f64,
    pub lon: f64,
    pub role: SampleRole,
}

impl SamplePoint {
    pub fn is_center(&self) -> bool {
        self.role == SampleRole::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokyo_roundtrip() {
        let tokyo = Coordinate::new(35.6553, 139.7487, Datum::Tokyo);
        let wgs = tokyo.to_wgs84();
        assert_eq!(wgs.datum, Datum::Wgs84);
        // The datum shift around Tokyo is roughly 450 m
        assert!((wgs.lat - tokyo.lat).abs() > 0.002);
        assert!((wgs.lon - tokyo.lon).abs() > 0.002);

        let back = wgs.to_tokyo();
        assert!((back.lat - tokyo.lat).abs() < 1e-5);
        assert!((back.lon - tokyo.lon).abs() < 1e-5);
    }

    #[test]
    fn test_wgs84_is_unchanged() {
        let c = Coordinate::wgs84(35.6586, 139.7454);
        assert_eq!(c.to_wgs84(), c);
    }

    #[test]
    fn test_parse_datum_and_precision() {
        assert_eq!("WGS84".parse::<Datum>().unwrap(), Datum::Wgs84);
        assert_eq!("tokyo".parse::<Datum>().unwrap(), Datum::Tokyo);
        assert!("jgd2011".parse::<Datum>().is_err());
        assert_eq!("high".parse::<Precision>().unwrap(), Precision::High);
        assert!(matches!(
            "medium".parse::<Precision>(),
            Err(HazardError::InvalidInput(_))
        ));
    }
}
