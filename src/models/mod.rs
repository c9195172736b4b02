//! Core data models for hazard assessment.

pub mod coordinate;
pub mod hazard;
pub mod report;

pub use coordinate::{Coordinate, Datum, Precision, SamplePoint, SampleRole};
pub use hazard::{Handler, HazardKind, HazardLevel};
pub use report::{
    EntryMap, GradedResult, HazardEntry, HazardReport, ProbabilityResult, Reading,
    SearchOutcome, UnavailableReason, NO_DATA_LABEL,
};
