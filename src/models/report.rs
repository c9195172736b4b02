//! Per-hazard results and the ordered report returned to callers.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::{Coordinate, Datum, HazardLevel, Precision, SamplePoint};
use crate::pip::RegionCode;
use crate::tile::LayerMode;

/// Label used when a reading has no data at all.
pub const NO_DATA_LABEL: &str = "データなし";

/// What one sample point saw on one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Tile fetch failed or timed out
    Unavailable,
    /// Transparent or unmatched pixel
    Clear,
    Hit(HazardLevel),
}

impl Reading {
    /// Severity rank used for the max: hit > clear > unavailable.
    fn rank(&self) -> (u8, f64) {
        match self {
            Reading::Unavailable => (0, 0.0),
            Reading::Clear => (1, 0.0),
            Reading::Hit(level) => (2, level.level),
        }
    }

    /// The more severe of two readings. Ties keep `self`.
    pub fn max(self, other: Reading) -> Reading {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn level(&self) -> Option<f64> {
        match self {
            Reading::Unavailable => None,
            Reading::Clear => Some(0.0),
            Reading::Hit(l) => Some(l.level),
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Reading::Hit(_))
    }
}

/// Max-across-samples and center value for one raster layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedResult {
    pub max: Reading,
    pub center: Reading,
    /// Label shown for a clear reading, e.g. "浸水なし"
    pub clear_label: &'static str,
    /// Path of the layer the values came from (differs from the primary after a fallback)
    pub layer: &'static str,
    pub mode: LayerMode,
}

impl GradedResult {
    fn label(&self, reading: &Reading) -> &'static str {
        match reading {
            Reading::Unavailable => NO_DATA_LABEL,
            Reading::Clear => self.clear_label,
            Reading::Hit(level) => level.label,
        }
    }

    pub fn max_info(&self) -> &'static str {
        self.label(&self.max)
    }

    pub fn center_info(&self) -> &'static str {
        self.label(&self.center)
    }
}

impl Serialize for GradedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.mode == LayerMode::Binary {
            map.serialize_entry("present", &self.max.is_hit())?;
        }
        map.serialize_entry("max_info", self.max_info())?;
        map.serialize_entry("center_info", self.center_info())?;
        map.serialize_entry("max_level", &self.max.level())?;
        map.serialize_entry("center_level", &self.center.level())?;
        map.serialize_entry("layer", self.layer)?;
        map.end()
    }
}

/// Max-across-samples and center value for a probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct ProbabilityResult {
    pub max_prob: Option<f64>,
    pub center_prob: Option<f64>,
}

impl ProbabilityResult {
    pub fn record(&mut self, value: Option<f64>, is_center: bool) {
        let Some(v) = value else { return };
        self.max_prob = Some(self.max_prob.map_or(v, |m| m.max(v)));
        if is_center {
            self.center_prob = Some(v);
        }
    }
}

/// Terminal state of a polygon search.
///
/// `center` is `None` when the center point was never checked, e.g. its
/// region failed to load or did not resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchOutcome {
    /// A sample point fell inside a polygon
    Present {
        point: SamplePoint,
        region: RegionCode,
        center: Option<bool>,
    },
    /// At least one region was evaluated and nothing matched
    Absent { center: Option<bool> },
    /// No region could be evaluated at all
    Unknown,
}

impl SearchOutcome {
    /// Center label: "あり", "なし", or no data when it was never checked.
    pub fn center_info(&self) -> &'static str {
        match self {
            SearchOutcome::Present { center, .. } | SearchOutcome::Absent { center } => {
                match center {
                    Some(true) => "あり",
                    Some(false) => "なし",
                    None => NO_DATA_LABEL,
                }
            }
            SearchOutcome::Unknown => NO_DATA_LABEL,
        }
    }
}

impl Serialize for SearchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            SearchOutcome::Present { point, region, .. } => {
                map.serialize_entry("status", "present")?;
                map.serialize_entry("present", &true)?;
                map.serialize_entry("max_info", "あり")?;
                map.serialize_entry("center_info", self.center_info())?;
                map.serialize_entry("point", point)?;
                map.serialize_entry("region", &region.to_string())?;
            }
            SearchOutcome::Absent { .. } => {
                map.serialize_entry("status", "absent")?;
                map.serialize_entry("present", &false)?;
                map.serialize_entry("max_info", "なし")?;
                map.serialize_entry("center_info", self.center_info())?;
            }
            SearchOutcome::Unknown => {
                map.serialize_entry("status", "unknown")?;
            }
        }
        map.end()
    }
}

/// Why a report entry carries no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The request deadline passed before the task finished
    TimedOut,
    /// Every upstream source for the entry failed
    NoCoverage,
}

impl Serialize for UnavailableReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            UnavailableReason::TimedOut => {
                map.serialize_entry("status", "unavailable")?;
                map.serialize_entry("reason", "timeout")?;
            }
            UnavailableReason::NoCoverage => {
                map.serialize_entry("status", "unknown")?;
                map.serialize_entry("reason", "no_coverage")?;
            }
        }
        map.end()
    }
}

/// One value in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HazardEntry {
    Probability(ProbabilityResult),
    Graded(GradedResult),
    Group(EntryMap),
    Search(SearchOutcome),
    Unavailable(UnavailableReason),
}

impl HazardEntry {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, HazardEntry::Unavailable(_))
    }
}

/// Insertion-ordered key → entry mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryMap(Vec<(String, HazardEntry)>);

impl EntryMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace, keeping the existing position on replace.
    pub fn insert(&mut self, key: impl Into<String>, entry: HazardEntry) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = entry,
            None => self.0.push((key, entry)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&HazardEntry> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HazardEntry)> {
        self.0.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for EntryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, entry) in &self.0 {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

/// Composite hazard assessment for one location.
#[derive(Debug, Clone, Serialize)]
pub struct HazardReport {
    /// Normalized (WGS84) center coordinate
    pub coordinates: Coordinate,
    pub input_datum: Datum,
    pub precision: Precision,
    pub hazard_info: EntryMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleRole;

    const DEEP: HazardLevel = HazardLevel {
        level: 5.0,
        label: "5m以上10m未満",
    };
    const SHALLOW: HazardLevel = HazardLevel {
        level: 0.2,
        label: "0.3m未満",
    };

    #[test]
    fn test_reading_max_ordering() {
        assert_eq!(Reading::Unavailable.max(Reading::Clear), Reading::Clear);
        assert_eq!(Reading::Clear.max(Reading::Hit(SHALLOW)), Reading::Hit(SHALLOW));
        assert_eq!(Reading::Hit(DEEP).max(Reading::Hit(SHALLOW)), Reading::Hit(DEEP));
        assert_eq!(Reading::Hit(SHALLOW).max(Reading::Unavailable), Reading::Hit(SHALLOW));
    }

    #[test]
    fn test_probability_record() {
        let mut p = ProbabilityResult::default();
        p.record(Some(0.3), true);
        p.record(None, false);
        p.record(Some(0.5), false);
        assert_eq!(p.max_prob, Some(0.5));
        assert_eq!(p.center_prob, Some(0.3));
    }

    #[test]
    fn test_entry_map_preserves_order() {
        let mut map = EntryMap::new();
        map.insert("b", HazardEntry::Unavailable(UnavailableReason::TimedOut));
        map.insert(
            "a",
            HazardEntry::Search(SearchOutcome::Absent {
                center: Some(false),
            }),
        );
        map.insert("b", HazardEntry::Search(SearchOutcome::Unknown));

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"b":{"status":"unknown"},"a":{"status":"absent","present":false,"max_info":"なし","center_info":"なし"}}"#);
    }

    #[test]
    fn test_graded_serialization() {
        let result = GradedResult {
            max: Reading::Hit(DEEP),
            center: Reading::Clear,
            clear_label: "浸水なし",
            layer: "01_flood_l2_shinsuishin_data",
            mode: LayerMode::Graded,
        };
        let value = serde_json::to_value(HazardEntry::Graded(result)).unwrap();
        assert_eq!(value["max_info"], "5m以上10m未満");
        assert_eq!(value["center_info"], "浸水なし");
        assert_eq!(value["max_level"], 5.0);
        assert_eq!(value["center_level"], 0.0);
        assert!(value.get("present").is_none());
    }

    #[test]
    fn test_binary_layer_reports_presence() {
        let zone = HazardLevel {
            level: 1.0,
            label: "家屋倒壊等氾濫想定区域",
        };
        let hit = GradedResult {
            max: Reading::Hit(zone),
            center: Reading::Clear,
            clear_label: "該当なし",
            layer: "01_flood_l2_kaokutoukai_hanran_data",
            mode: LayerMode::Binary,
        };
        let value = serde_json::to_value(&hit).unwrap();
        assert_eq!(value["present"], true);
        assert_eq!(value["max_level"], 1.0);

        let clear = GradedResult {
            max: Reading::Clear,
            ..hit
        };
        assert_eq!(serde_json::to_value(&clear).unwrap()["present"], false);
    }

    #[test]
    fn test_present_outcome_serialization() {
        let outcome = SearchOutcome::Present {
            point: SamplePoint {
                lat: 35.0,
                lon: 139.0,
                role: SampleRole::Ring,
            },
            region: RegionCode::new(13).unwrap(),
            center: Some(false),
        };
        let value = serde_json::to_value(outcome).unwrap();
        assert_eq!(value["status"], "present");
        assert_eq!(value["center_info"], "なし");
        assert_eq!(value["region"], "13");
        assert_eq!(value["point"]["role"], "ring");
    }

    #[test]
    fn test_unchecked_center_is_no_data() {
        let outcome = SearchOutcome::Present {
            point: SamplePoint {
                lat: 35.0,
                lon: 139.0,
                role: SampleRole::Directional,
            },
            region: RegionCode::new(11).unwrap(),
            center: None,
        };
        assert_eq!(serde_json::to_value(outcome).unwrap()["center_info"], "データなし");

        let absent = SearchOutcome::Absent { center: None };
        let value = serde_json::to_value(absent).unwrap();
        assert_eq!(value["status"], "absent");
        assert_eq!(value["center_info"], "データなし");
    }
}
