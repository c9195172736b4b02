//! R-tree over one region's polygons.

use geo::{BoundingRect, Contains, Point};
use geo_types::Polygon;
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::geojson::parse_polygons;
use super::RegionCode;
use crate::error::HazardError;

/// Wrapper for R-tree indexing of polygons
pub struct IndexedPolygon {
    pub polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedPolygon {
    pub fn new(polygon: Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self {
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
            polygon,
        })
    }
}

/// Immutable once built; shared between concurrent searches.
pub struct RegionPolygonIndex {
    region: RegionCode,
    tree: RTree<IndexedPolygon>,
}

impl RegionPolygonIndex {
    pub fn build(region: RegionCode, polygons: Vec<Polygon<f64>>) -> Self {
        let indexed: Vec<IndexedPolygon> =
            polygons.into_iter().filter_map(IndexedPolygon::new).collect();
        let tree = RTree::bulk_load(indexed);
        info!(region = %region, polygons = tree.size(), "region index built");
        Self { region, tree }
    }

    /// Parse a region's GeoJSON and index it.
    pub fn from_geojson(region: RegionCode, bytes: &[u8]) -> Result<Self, HazardError> {
        let polygons = parse_polygons(bytes)
            .map_err(|detail| HazardError::IndexBuildFailure { region, detail })?;
        Ok(Self::build(region, polygons))
    }

    /// Whether any polygon contains the point.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        // Envelope candidates first, exact containment second
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .any(|ip| ip.polygon.contains(&point))
    }

    pub fn region(&self) -> RegionCode {
        self.region
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
