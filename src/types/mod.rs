//! Type definitions for the bridge assessment form

pub mod outcome;
pub mod request;

pub use outcome::{ClassProbabilities, Condition, Outcome};
pub use request::{AssessmentForm, AssessmentRequest, MaintenanceLevel, Material};
