//! Hazardscope - composite natural-hazard assessment for a point in Japan
//!
//! Samples hazard-map raster tiles and region polygon sets around a
//! location and folds the results into one ordered report.

pub mod assessor;
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod models;
pub mod pip;
pub mod sources;
pub mod tile;

pub use assessor::{AssessmentRequest, Collaborators, HazardAssessor, Location};
pub use config::Config;
pub use error::HazardError;
pub use models::{Coordinate, Datum, HazardKind, HazardReport, Precision};
