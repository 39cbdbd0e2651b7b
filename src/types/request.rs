//! Assessment request data structures and form coercion

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

/// Bridge construction material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Concrete,
    Steel,
}

impl Material {
    /// Every selectable material, in display order
    pub const ALL: [Material; 2] = [Material::Concrete, Material::Steel];

    /// Category label as it appears in the training data
    pub fn label(&self) -> &'static str {
        match self {
            Material::Concrete => "Concrete",
            Material::Steel => "Steel",
        }
    }

    /// Integer code used by encoded models
    pub fn code(&self) -> i64 {
        match self {
            Material::Concrete => 0,
            Material::Steel => 1,
        }
    }
}

impl FromStr for Material {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Material::ALL
            .into_iter()
            .find(|m| m.label() == s.trim())
            .ok_or_else(|| InputError::UnknownMaterial(s.to_string()))
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maintenance regime applied to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceLevel {
    None,
    Annual,
    BiAnnual,
}

impl MaintenanceLevel {
    /// Every selectable maintenance level, in display order
    pub const ALL: [MaintenanceLevel; 3] = [
        MaintenanceLevel::None,
        MaintenanceLevel::Annual,
        MaintenanceLevel::BiAnnual,
    ];

    /// Category label as it appears in the training data.
    ///
    /// "No-Maintainance" is misspelled in the dataset; raw-mode models match on it verbatim.
    pub fn label(&self) -> &'static str {
        match self {
            MaintenanceLevel::None => "No-Maintainance",
            MaintenanceLevel::Annual => "Annual",
            MaintenanceLevel::BiAnnual => "Bi-Annual",
        }
    }

    /// Integer code used by encoded models
    pub fn code(&self) -> i64 {
        match self {
            MaintenanceLevel::None => 0,
            MaintenanceLevel::Annual => 1,
            MaintenanceLevel::BiAnnual => 2,
        }
    }
}

impl FromStr for MaintenanceLevel {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaintenanceLevel::ALL
            .into_iter()
            .find(|m| m.label() == s.trim())
            .ok_or_else(|| InputError::UnknownMaintenance(s.to_string()))
    }
}

impl fmt::Display for MaintenanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw form submission, exactly as posted by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentForm {
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub traffic: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub maintenance: String,
}

impl Default for AssessmentForm {
    /// Initial values shown on first page load
    fn default() -> Self {
        Self {
            age: "10".to_string(),
            traffic: "1000".to_string(),
            material: Material::Concrete.label().to_string(),
            maintenance: MaintenanceLevel::None.label().to_string(),
        }
    }
}

/// One bridge to assess. Lives for a single submission only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Age of the bridge in years
    pub age: u32,
    /// Traffic volume
    pub traffic_volume: u32,
    pub material: Material,
    pub maintenance: MaintenanceLevel,
}

impl AssessmentRequest {
    pub fn new(
        age: u32,
        traffic_volume: u32,
        material: Material,
        maintenance: MaintenanceLevel,
    ) -> Self {
        Self {
            age,
            traffic_volume,
            material,
            maintenance,
        }
    }
}

/// Coerce the four submitted fields into an [`AssessmentRequest`].
///
/// Numbers must be non-negative integers; categories must be one of the listed choices.
pub fn collect_input(form: &AssessmentForm) -> Result<AssessmentRequest, InputError> {
    let age = parse_count("Age of Bridge", &form.age)?;
    let traffic_volume = parse_count("Traffic Volume", &form.traffic)?;

    if form.material.trim().is_empty() {
        return Err(InputError::MissingField("Material Type"));
    }
    if form.maintenance.trim().is_empty() {
        return Err(InputError::MissingField("Maintenance Level"));
    }

    Ok(AssessmentRequest {
        age,
        traffic_volume,
        material: form.material.parse()?,
        maintenance: form.maintenance.parse()?,
    })
}

fn parse_count(field: &'static str, value: &str) -> Result<u32, InputError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InputError::MissingField(field));
    }
    value.parse::<u32>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => InputError::OutOfRange {
            field,
            value: value.to_string(),
        },
        _ => InputError::InvalidNumber {
            field,
            value: value.to_string(),
        },
    })
}
