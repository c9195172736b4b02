//! GeoJSON FeatureCollection → polygons.
//!
//! Only Polygon and MultiPolygon geometries carry area; everything else in
//! a collection is skipped.

use geo_types::{Coord, LineString, Polygon};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

type Ring = Vec<Vec<f64>>;

fn to_line_string(ring: Ring) -> Result<LineString<f64>, String> {
    let coords = ring
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!("bad position {:?}", position)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if coords.len() < 4 {
        return Err(format!("ring has {} positions, need at least 4", coords.len()));
    }
    Ok(LineString::new(coords))
}

fn to_polygon(rings: Vec<Ring>) -> Result<Polygon<f64>, String> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| "polygon without exterior ring".to_string())
        .and_then(to_line_string)?;
    let interiors = rings.map(to_line_string).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a FeatureCollection into its polygons (multipolygons are flattened).
pub fn parse_polygons(bytes: &[u8]) -> Result<Vec<Polygon<f64>>, String> {
    let collection: FeatureCollection =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid GeoJSON: {}", e))?;
    if collection.kind != "FeatureCollection" {
        return Err(format!("expected FeatureCollection, got {}", collection.kind));
    }

    let mut polygons = Vec::new();
    let mut skipped = 0usize;
    for geometry in collection.features.into_iter().filter_map(|f| f.geometry) {
        match geometry.kind.as_str() {
            "Polygon" => {
                let rings: Vec<Ring> = serde_json::from_value(geometry.coordinates)
                    .map_err(|e| format!("bad Polygon coordinates: {}", e))?;
                polygons.push(to_polygon(rings)?);
            }
            "MultiPolygon" => {
                let parts: Vec<Vec<Ring>> = serde_json::from_value(geometry.coordinates)
                    .map_err(|e| format!("bad MultiPolygon coordinates: {}", e))?;
                for rings in parts {
                    polygons.push(to_polygon(rings)?);
                }
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "ignored non-areal geometries");
    }
    Ok(polygons)
}
