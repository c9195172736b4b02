//! Point-in-Polygon (PIP) presence search.
//!
//! Region polygon sets are loaded from a blob store on first use, indexed
//! with an R-tree and shared between concurrent searches.

mod cache;
mod geojson;
mod index;
mod region;
mod service;

pub use cache::{CacheStats, RegionIndexCache};
pub use geojson::parse_polygons;
pub use index::{IndexedPolygon, RegionPolygonIndex};
pub use region::RegionCode;
pub use service::FillLandSearch;
