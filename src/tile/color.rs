//! Hazard-map raster layers and their legend color tables.

use serde::Serialize;
use std::sync::OnceLock;

use super::sampling::SAMPLING_ZOOM;
use crate::models::HazardLevel;

/// How a layer's matches are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerMode {
    /// Ordinal/numeric levels, aggregated by max
    Graded,
    /// Any match means present (level 1), aggregated by logical OR
    Binary,
}

/// One legend entry: a center color, a channel-wise tolerance and the level it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorClass {
    pub color: [u8; 3],
    pub tolerance: u8,
    pub level: HazardLevel,
}

/// Tolerance that matches every opaque pixel.
pub const CATCH_ALL: u8 = u8::MAX;

/// Channel tolerance for legend colors, absorbs PNG quantization noise.
const LEGEND_TOLERANCE: u8 = 2;

impl ColorClass {
    const fn new(color: [u8; 3], level: f64, label: &'static str) -> Self {
        Self {
            color,
            tolerance: LEGEND_TOLERANCE,
            level: HazardLevel { level, label },
        }
    }

    const fn catch_all(level: f64, label: &'static str) -> Self {
        Self {
            color: [0, 0, 0],
            tolerance: CATCH_ALL,
            level: HazardLevel { level, label },
        }
    }

    pub fn matches(&self, rgb: [u8; 3]) -> bool {
        self.color
            .iter()
            .zip(rgb.iter())
            .all(|(c, p)| c.abs_diff(*p) <= self.tolerance)
    }

    fn overlaps(&self, other: &ColorClass) -> bool {
        let reach = self.tolerance as u16 + other.tolerance as u16;
        self.color
            .iter()
            .zip(other.color.iter())
            .all(|(a, b)| (a.abs_diff(*b) as u16) <= reach)
    }
}

const WATER_DEPTH: &[ColorClass] = &[
    ColorClass::new([220, 122, 220], 20.0, "20m以上"),
    ColorClass::new([242, 133, 201], 10.0, "10m以上20m未満"),
    ColorClass::new([255, 145, 145], 5.0, "5m以上10m未満"),
    ColorClass::new([255, 183, 183], 3.0, "3m以上5m未満"),
    ColorClass::new([255, 216, 192], 1.0, "0.5m以上3m未満"),
    ColorClass::new([248, 225, 166], 0.5, "0.5m以上1m未満"),
    ColorClass::new([247, 245, 169], 0.4, "0.5m未満"),
    ColorClass::new([255, 255, 179], 0.2, "0.3m未満"),
];

const FLOOD_DURATION: &[ColorClass] = &[
    ColorClass::new([96, 0, 96], 28.0, "4週間以上～"),
    ColorClass::new([180, 0, 104], 21.0, "2週間以上～"),
    ColorClass::new([255, 40, 0], 14.0, "1週間～2週間未満"),
    ColorClass::new([255, 153, 0], 7.0, "3日～1週間未満"),
    ColorClass::new([250, 245, 0], 3.0, "1日～3日未満"),
    ColorClass::new([0, 65, 255], 1.0, "12時間～1日未満"),
    ColorClass::new([160, 210, 255], 0.5, "12時間未満"),
];

const HOUSE_COLLAPSE: &[ColorClass] = &[ColorClass::catch_all(1.0, "該当あり")];

const DEBRIS_FLOW: &[ColorClass] = &[
    ColorClass::new([165, 0, 33], 2.0, "土石流(特別警戒)"),
    ColorClass::new([230, 200, 50], 1.0, "土石流"),
];

const STEEP_SLOPE: &[ColorClass] = &[
    ColorClass::new([250, 40, 0], 2.0, "急傾斜地(特別警戒)"),
    ColorClass::new([250, 230, 0], 1.0, "急傾斜地"),
];

const LANDSLIDE: &[ColorClass] = &[
    ColorClass::new([180, 0, 40], 2.0, "地すべり(特別警戒)"),
    ColorClass::new([255, 153, 0], 1.0, "地すべり"),
];

/// A raster hazard layer served as 256×256 PNG tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterLayer {
    /// Flood depth, maximum assumed rainfall scenario (L2)
    FloodMaxScenario,
    /// Flood depth, planned-scale rainfall scenario (L1)
    FloodPlannedScenario,
    FloodDuration,
    /// House-collapse zone, overflow
    HouseCollapseFlow,
    Tsunami,
    HighTide,
    DebrisFlow,
    SteepSlope,
    Landslide,
}

impl RasterLayer {
    pub fn all() -> &'static [RasterLayer] {
        &[
            RasterLayer::FloodMaxScenario,
            RasterLayer::FloodPlannedScenario,
            RasterLayer::FloodDuration,
            RasterLayer::HouseCollapseFlow,
            RasterLayer::Tsunami,
            RasterLayer::HighTide,
            RasterLayer::DebrisFlow,
            RasterLayer::SteepSlope,
            RasterLayer::Landslide,
        ]
    }

    /// Directory of this layer on the tile server
    pub fn path(&self) -> &'static str {
        match self {
            RasterLayer::FloodMaxScenario => "01_flood_l2_shinsuishin_data",
            RasterLayer::FloodPlannedScenario => "01_flood_l1_shinsuishin_newlegend_data",
            RasterLayer::FloodDuration => "01_flood_l2_keizoku_data",
            RasterLayer::HouseCollapseFlow => "01_flood_l2_kaokutoukai_hanran_data",
            RasterLayer::Tsunami => "04_tsunami_newlegend_data",
            RasterLayer::HighTide => "03_hightide_l2_shinsuishin_data",
            RasterLayer::DebrisFlow => "05_dosekiryukeikaikuiki",
            RasterLayer::SteepSlope => "05_kyukeishakeikaikuiki",
            RasterLayer::Landslide => "05_jisuberikeikaikuiki",
        }
    }

    pub fn zoom(&self) -> u8 {
        SAMPLING_ZOOM
    }

    pub fn mode(&self) -> LayerMode {
        match self {
            RasterLayer::HouseCollapseFlow => LayerMode::Binary,
            _ => LayerMode::Graded,
        }
    }

    /// Legend entries, most specific first.
    pub fn table(&self) -> &'static [ColorClass] {
        match self {
            RasterLayer::FloodMaxScenario
            | RasterLayer::FloodPlannedScenario
            | RasterLayer::Tsunami
            | RasterLayer::HighTide => WATER_DEPTH,
            RasterLayer::FloodDuration => FLOOD_DURATION,
            RasterLayer::HouseCollapseFlow => HOUSE_COLLAPSE,
            RasterLayer::DebrisFlow => DEBRIS_FLOW,
            RasterLayer::SteepSlope => STEEP_SLOPE,
            RasterLayer::Landslide => LANDSLIDE,
        }
    }

    /// Label for a point with no hazard on this layer
    pub fn clear_label(&self) -> &'static str {
        match self {
            RasterLayer::FloodMaxScenario | RasterLayer::FloodPlannedScenario => "浸水なし",
            RasterLayer::FloodDuration | RasterLayer::Tsunami | RasterLayer::HighTide => {
                "浸水想定なし"
            }
            _ => "該当なし",
        }
    }

    /// Lower-scenario layer consulted in high precision when this one shows nothing.
    pub fn fallback(&self) -> Option<RasterLayer> {
        match self {
            RasterLayer::FloodMaxScenario => Some(RasterLayer::FloodPlannedScenario),
            _ => None,
        }
    }
}

/// Classify one RGBA pixel on a layer.
///
/// Transparent and unmatched pixels yield `None`. The first table entry
/// within tolerance wins; on binary layers any match is reported as level 1.
pub fn classify(layer: RasterLayer, rgba: [u8; 4]) -> Option<HazardLevel> {
    if rgba[3] == 0 {
        return None;
    }
    let rgb = [rgba[0], rgba[1], rgba[2]];
    let class = layer.table().iter().find(|c| c.matches(rgb))?;

    Some(match layer.mode() {
        LayerMode::Graded => class.level,
        LayerMode::Binary => HazardLevel {
            level: 1.0,
            label: class.level.label,
        },
    })
}

/// Validate every layer's table, once per process.
pub fn check_tables() -> Result<(), &'static str> {
    static CHECKED: OnceLock<Result<(), String>> = OnceLock::new();
    CHECKED
        .get_or_init(|| {
            RasterLayer::all().iter().try_for_each(|layer| {
                validate_table(layer.table()).map_err(|e| format!("{}: {}", layer.path(), e))
            })
        })
        .as_ref()
        .map(|_| ())
        .map_err(String::as_str)
}

/// Check a table for overlapping tolerance boxes and a misplaced catch-all.
pub fn validate_table(table: &[ColorClass]) -> Result<(), String> {
    for (i, a) in table.iter().enumerate() {
        if a.tolerance == CATCH_ALL {
            if i + 1 != table.len() {
                return Err(format!("catch-all entry \"{}\" is not last", a.level.label));
            }
            continue;
        }
        for b in table[i + 1..].iter().filter(|b| b.tolerance != CATCH_ALL) {
            if a.overlaps(b) {
                return Err(format!(
                    "\"{}\" and \"{}\" overlap",
                    a.level.label, b.level.label
                ));
            }
        }
    }
    Ok(())
}
