//! Feature encoding for bridge condition model inference.
//!
//! Turns an [`AssessmentRequest`] into the single-row record the model was
//! trained on. Column names and order match the training frame.

use crate::config::CategoricalEncoding;
use crate::types::request::AssessmentRequest;
use serde::Serialize;
use std::fmt;

/// Feature names in training-frame order
pub const FEATURE_NAMES: [&str; 4] = [
    "Age_of_Bridge",
    "Traffic_Volume",
    "Material_Type",
    "Maintenance_Level",
];

/// Whether a feature is one of the two categorical columns
pub fn is_categorical(feature: &str) -> bool {
    feature == FEATURE_NAMES[2] || feature == FEATURE_NAMES[3]
}

/// A single cell of the structured record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Category(&'static str),
}

impl FeatureValue {
    /// Numeric view used by the single float tensor layout
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FeatureValue::Int(v) => Some(*v as f32),
            FeatureValue::Category(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Category(c) => f.write_str(c),
        }
    }
}

/// Single-row tabular representation of one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredRecord {
    pub encoding: CategoricalEncoding,
    #[serde(rename = "Age_of_Bridge")]
    pub age_of_bridge: i64,
    #[serde(rename = "Traffic_Volume")]
    pub traffic_volume: i64,
    #[serde(rename = "Material_Type")]
    pub material_type: FeatureValue,
    #[serde(rename = "Maintenance_Level")]
    pub maintenance_level: FeatureValue,
}

impl StructuredRecord {
    /// (name, value) pairs in training-frame order
    pub fn columns(&self) -> [(&'static str, FeatureValue); 4] {
        [
            (FEATURE_NAMES[0], FeatureValue::Int(self.age_of_bridge)),
            (FEATURE_NAMES[1], FeatureValue::Int(self.traffic_volume)),
            (FEATURE_NAMES[2], self.material_type.clone()),
            (FEATURE_NAMES[3], self.maintenance_level.clone()),
        ]
    }

    /// Flat float vector for models with one `[1, 4]` input.
    ///
    /// Returns `None` for raw records, which carry category text.
    pub fn to_dense(&self) -> Option<Vec<f32>> {
        self.columns().iter().map(|(_, v)| v.as_f32()).collect()
    }
}

/// Encoder that transforms assessment requests into model input records.
pub struct FeatureEncoder {
    encoding: CategoricalEncoding,
}

impl FeatureEncoder {
    /// Create a new feature encoder for the given categorical encoding.
    pub fn new(encoding: CategoricalEncoding) -> Self {
        Self { encoding }
    }

    /// Encode a request into a structured record.
    pub fn encode(&self, request: &AssessmentRequest) -> StructuredRecord {
        let (material_type, maintenance_level) = match self.encoding {
            CategoricalEncoding::Encoded => (
                FeatureValue::Int(request.material.code()),
                FeatureValue::Int(request.maintenance.code()),
            ),
            CategoricalEncoding::Raw => (
                FeatureValue::Category(request.material.label()),
                FeatureValue::Category(request.maintenance.label()),
            ),
        };

        StructuredRecord {
            encoding: self.encoding,
            age_of_bridge: i64::from(request.age),
            traffic_volume: i64::from(request.traffic_volume),
            material_type,
            maintenance_level,
        }
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new(CategoricalEncoding::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::{MaintenanceLevel, Material};

    fn all_requests() -> Vec<AssessmentRequest> {
        let mut requests = Vec::new();
        for material in Material::ALL {
            for maintenance in MaintenanceLevel::ALL {
                requests.push(AssessmentRequest::new(20, 5000, material, maintenance));
            }
        }
        requests
    }

    #[test]
    fn test_encoded_mode_codes() {
        let encoder = FeatureEncoder::new(CategoricalEncoding::Encoded);
        let request =
            AssessmentRequest::new(20, 5000, Material::Steel, MaintenanceLevel::BiAnnual);

        let record = encoder.encode(&request);

        assert_eq!(record.to_dense().unwrap(), vec![20.0, 5000.0, 1.0, 2.0]);
    }

    #[test]
    fn test_encoded_mode_never_unmapped() {
        let encoder = FeatureEncoder::new(CategoricalEncoding::Encoded);
        for request in all_requests() {
            let record = encoder.encode(&request);
            assert!(matches!(record.material_type, FeatureValue::Int(0 | 1)));
            assert!(matches!(record.maintenance_level, FeatureValue::Int(0..=2)));
        }
    }

    #[test]
    fn test_raw_mode_passes_labels_through() {
        let encoder = FeatureEncoder::new(CategoricalEncoding::Raw);
        for request in all_requests() {
            let record = encoder.encode(&request);
            assert_eq!(
                record.material_type,
                FeatureValue::Category(request.material.label())
            );
            assert_eq!(
                record.maintenance_level,
                FeatureValue::Category(request.maintenance.label())
            );
            assert!(record.to_dense().is_none());
        }
    }

    #[test]
    fn test_record_column_order() {
        let encoder = FeatureEncoder::default();
        let record = encoder.encode(&AssessmentRequest::new(
            3,
            40,
            Material::Concrete,
            MaintenanceLevel::Annual,
        ));

        let names: Vec<&str> = record.columns().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, FEATURE_NAMES);
        assert!(is_categorical("Material_Type"));
        assert!(!is_categorical("Traffic_Volume"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Material_Type"], 0);
        assert_eq!(json["Maintenance_Level"], 1);
    }
}
