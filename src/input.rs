//! Free-text location input: "lat, lon" pairs or addresses.

use regex::Regex;
use std::sync::OnceLock;

use crate::assessor::Location;
use crate::error::HazardError;
use crate::models::{Coordinate, Datum};

fn latlon_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(-?\d{1,2}(?:\.\d+)?)\s*,\s*(-?\d{1,3}(?:\.\d+)?)\s*$")
            .expect("lat/lon pattern is valid")
    })
}

/// Classify `text` as a coordinate pair (in `datum`) or an address.
pub fn parse_location(text: &str, datum: Datum) -> Result<Location, HazardError> {
    if let Some(caps) = latlon_pattern().captures(text) {
        let lat: f64 = caps[1]
            .parse()
            .map_err(|_| HazardError::InvalidInput(format!("bad latitude in \"{}\"", text)))?;
        let lon: f64 = caps[2]
            .parse()
            .map_err(|_| HazardError::InvalidInput(format!("bad longitude in \"{}\"", text)))?;
        return Ok(Location::Coordinates(Coordinate::new(lat, lon, datum)));
    }

    let address = text.trim();
    if address.is_empty() {
        return Err(HazardError::InvalidInput("empty location".to_string()));
    }
    Ok(Location::Address(address.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlon_pairs() {
        for text in [
            "35.6895,139.6917",
            "-34.6037, -58.3816",
            "   35.6895  ,  139.6917   ",
            "0,0",
            "90,180",
        ] {
            assert!(
                matches!(parse_location(text, Datum::Wgs84), Ok(Location::Coordinates(_))),
                "{} should be a coordinate",
                text
            );
        }

        match parse_location("35.6586, 139.7454", Datum::Tokyo).unwrap() {
            Location::Coordinates(c) => {
                assert_eq!((c.lat, c.lon), (35.6586, 139.7454));
                assert_eq!(c.datum, Datum::Tokyo);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_addresses() {
        for text in [
            "東京都千代田区",
            "Hokkaido, Japan",
            "35.6895, 139.6917, extra",
            "not a coordinate",
        ] {
            assert!(
                matches!(parse_location(text, Datum::Wgs84), Ok(Location::Address(_))),
                "{} should be an address",
                text
            );
        }
        assert!(parse_location("   ", Datum::Wgs84).is_err());
    }
}
