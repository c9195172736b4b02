//! The closed set of hazard types a report can contain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HazardError;
use crate::tile::RasterLayer;

/// A hazard phenomenon that can be requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    /// Probability of strong shaking within 30 years (J-SHIS)
    Earthquake,
    /// Maximum assumed flood depth
    Flood,
    /// Flood inundation duration
    #[serde(rename = "flood_keizoku")]
    FloodDuration,
    /// House-collapse zone caused by overflow
    #[serde(rename = "kaokutoukai_hanran")]
    HouseCollapseFlow,
    Tsunami,
    /// Storm surge
    HighTide,
    /// Sediment disaster warning zones (debris flow, steep slope, landslide)
    Landslide,
    /// Large-scale residential fill land (vector polygons)
    LargeFillLand,
}

/// How a hazard kind is resolved. Bound once per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Point API queried at every sample point
    QuakeProbability,
    /// One raster layer sampled into one report entry
    Raster(RasterLayer),
    /// Several raster layers reported together under one key
    RasterGroup(&'static [(&'static str, RasterLayer)]),
    /// Polygon search with early exit
    PolygonSearch,
}

const LANDSLIDE_GROUP: &[(&str, RasterLayer)] = &[
    ("debris_flow", RasterLayer::DebrisFlow),
    ("steep_slope", RasterLayer::SteepSlope),
    ("landslide", RasterLayer::Landslide),
];

impl HazardKind {
    /// Every kind, in default report order.
    pub fn all() -> &'static [HazardKind] {
        &[
            HazardKind::Earthquake,
            HazardKind::Flood,
            HazardKind::FloodDuration,
            HazardKind::HouseCollapseFlow,
            HazardKind::Tsunami,
            HazardKind::HighTide,
            HazardKind::Landslide,
            HazardKind::LargeFillLand,
        ]
    }

    /// Request name of this kind
    pub fn wire_name(&self) -> &'static str {
        match self {
            HazardKind::Earthquake => "earthquake",
            HazardKind::Flood => "flood",
            HazardKind::FloodDuration => "flood_keizoku",
            HazardKind::HouseCollapseFlow => "kaokutoukai_hanran",
            HazardKind::Tsunami => "tsunami",
            HazardKind::HighTide => "high_tide",
            HazardKind::Landslide => "landslide",
            HazardKind::LargeFillLand => "large_fill_land",
        }
    }

    /// Keys this kind contributes to a report, in order.
    pub fn report_keys(&self) -> &'static [&'static str] {
        match self {
            HazardKind::Earthquake => &["jshis_prob_50", "jshis_prob_60"],
            HazardKind::Flood => &["inundation_depth"],
            HazardKind::FloodDuration => &["flood_keizoku"],
            HazardKind::HouseCollapseFlow => &["kaokutoukai_hanran"],
            HazardKind::Tsunami => &["tsunami_inundation"],
            HazardKind::HighTide => &["hightide_inundation"],
            HazardKind::Landslide => &["landslide_hazard"],
            HazardKind::LargeFillLand => &["large_fill_land"],
        }
    }

    pub fn handler(&self) -> Handler {
        match self {
            HazardKind::Earthquake => Handler::QuakeProbability,
            HazardKind::Flood => Handler::Raster(RasterLayer::FloodMaxScenario),
            HazardKind::FloodDuration => Handler::Raster(RasterLayer::FloodDuration),
            HazardKind::HouseCollapseFlow => Handler::Raster(RasterLayer::HouseCollapseFlow),
            HazardKind::Tsunami => Handler::Raster(RasterLayer::Tsunami),
            HazardKind::HighTide => Handler::Raster(RasterLayer::HighTide),
            HazardKind::Landslide => Handler::RasterGroup(LANDSLIDE_GROUP),
            HazardKind::LargeFillLand => Handler::PolygonSearch,
        }
    }

    /// Parse a comma-separated list, dropping duplicates but keeping order.
    pub fn parse_list(s: &str) -> Result<Vec<HazardKind>, HazardError> {
        let mut kinds = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind: HazardKind = part.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for HazardKind {
    type Err = HazardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HazardKind::all()
            .iter()
            .find(|k| k.wire_name() == s)
            .copied()
            .ok_or_else(|| HazardError::InvalidInput(format!("unknown hazard type \"{}\"", s)))
    }
}

/// A classified severity: ordinal/numeric level plus its legend label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HazardLevel {
    pub level: f64,
    pub label: &'static str,
}
