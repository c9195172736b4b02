//! Error types shared by the sampling engine and its collaborators.

use thiserror::Error;

use crate::pip::RegionCode;

/// Errors produced while assessing a location.
///
/// Only `InvalidCoordinate`, `NotFound` and `InvalidInput` ever reach the
/// caller of [`crate::HazardAssessor::assess`]. The remaining variants are
/// absorbed by the individual hazard tasks and show up in the report as
/// "no data", "unknown" or "unavailable".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HazardError {
    #[error("coordinate ({lat}, {lon}) is outside the supported range")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("{source_name} unavailable: {detail}")]
    UpstreamUnavailable { source_name: String, detail: String },

    #[error("failed to build polygon index for region {region}: {detail}")]
    IndexBuildFailure { region: RegionCode, detail: String },

    #[error("every source failed for {key}")]
    TotalCoverageFailure { key: String },

    #[error("invalid legend table: {0}")]
    InvalidLegend(String),

    #[error("location not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl HazardError {
    pub fn upstream(source_name: impl Into<String>, detail: impl ToString) -> Self {
        HazardError::UpstreamUnavailable {
            source_name: source_name.into(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HazardError>;
