//! Prediction outcome data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binary condition verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Good,
    Poor,
}

impl Condition {
    /// Label 0 is Good; every other label is Poor
    pub fn from_label(label: i64) -> Self {
        if label == 0 {
            Condition::Good
        } else {
            Condition::Poor
        }
    }

    /// Display text for the verdict
    pub fn display(&self) -> &'static str {
        match self {
            Condition::Good => "Good Condition",
            Condition::Poor => "Poor Condition",
        }
    }
}

/// Class probabilities for a single row, normalized so that `good + poor == 1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub good: f64,
    pub poor: f64,
}

impl ClassProbabilities {
    /// Build from raw class scores, renormalizing away float drift.
    ///
    /// Returns `None` if the scores are negative, non-finite or sum to zero.
    pub fn new(good: f64, poor: f64) -> Option<Self> {
        if !good.is_finite() || !poor.is_finite() || good < 0.0 || poor < 0.0 {
            return None;
        }
        let total = good + poor;
        if total <= 0.0 {
            return None;
        }
        Some(Self {
            good: good / total,
            poor: poor / total,
        })
    }

    /// Build from a per-class probability vector (index 0 = good, the rest = poor)
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        match scores {
            [] => None,
            [single] => Self::new(1.0 - single, *single),
            [good, rest @ ..] => Self::new(*good, rest.iter().sum()),
        }
    }
}

/// Result of one assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    /// Raw class label returned by the model
    pub label: i64,
    /// Verdict derived from the label
    pub condition: Condition,
    /// Class probabilities, when requested and supported
    pub probabilities: Option<ClassProbabilities>,
    /// When the assessment ran
    pub assessed_at: DateTime<Utc>,
}

impl Outcome {
    pub fn new(label: i64) -> Self {
        Self {
            label,
            condition: Condition::from_label(label),
            probabilities: None,
            assessed_at: Utc::now(),
        }
    }

    /// Attach a probability breakdown
    pub fn with_probabilities(mut self, probabilities: Option<ClassProbabilities>) -> Self {
        self.probabilities = probabilities;
        self
    }

    /// Headline shown on the result page, e.g. "Prediction: Good Condition (0)"
    pub fn headline(&self) -> String {
        format!("Prediction: {} ({})", self.condition.display(), self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_from_label() {
        assert_eq!(Condition::from_label(0), Condition::Good);
        assert_eq!(Condition::from_label(1), Condition::Poor);
        assert_eq!(Condition::from_label(2), Condition::Poor);
        assert_eq!(Condition::from_label(-1), Condition::Poor);
    }

    #[test]
    fn test_headline() {
        assert_eq!(Outcome::new(0).headline(), "Prediction: Good Condition (0)");
        assert_eq!(Outcome::new(1).headline(), "Prediction: Poor Condition (1)");
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let p = ClassProbabilities::new(0.7000001, 0.3).unwrap();
        assert!((p.good + p.poor - 1.0).abs() < 1e-9);

        let p = ClassProbabilities::from_scores(&[0.2, 0.5, 0.3]).unwrap();
        assert!((p.good - 0.2).abs() < 1e-9);
        assert!((p.good + p.poor - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_score_is_positive_class() {
        let p = ClassProbabilities::from_scores(&[0.8]).unwrap();
        assert!((p.poor - 0.8).abs() < 1e-9);
        assert!(p.poor > p.good);
    }

    #[test]
    fn test_invalid_probabilities_rejected() {
        assert!(ClassProbabilities::new(0.0, 0.0).is_none());
        assert!(ClassProbabilities::new(f64::NAN, 0.5).is_none());
        assert!(ClassProbabilities::new(-0.1, 1.1).is_none());
        assert!(ClassProbabilities::from_scores(&[]).is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = Outcome::new(1).with_probabilities(ClassProbabilities::new(0.25, 0.75));
        let json = serde_json::to_string(&outcome).unwrap();
        let deserialized: Outcome = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.label, 1);
        assert_eq!(deserialized.condition, Condition::Poor);
        assert_eq!(deserialized.probabilities, outcome.probabilities);
    }
}
