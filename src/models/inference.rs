//! Classifier interface and ONNX Runtime implementation

use crate::config::CategoricalEncoding;
use crate::error::{PredictionError, Result};
use crate::feature_encoder::{is_categorical, FeatureValue, StructuredRecord};
use crate::types::outcome::{ClassProbabilities, Outcome};
use ort::memory::Allocator;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{
    DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor, ValueType,
};
use std::sync::Mutex;
use tracing::debug;

/// A pre-trained binary classifier over one structured record.
pub trait Classifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Predicted class label for a single row
    fn predict(&self, record: &StructuredRecord) -> Result<i64>;

    /// Class probabilities for a single row, if the model exposes them
    fn predict_proba(&self, record: &StructuredRecord) -> Result<Option<ClassProbabilities>>;

    /// Run a full assessment. Implementations that can answer both questions
    /// in one pass should override this.
    fn assess(&self, record: &StructuredRecord, with_probabilities: bool) -> Result<Outcome> {
        let label = self.predict(record)?;
        let probabilities = if with_probabilities {
            self.predict_proba(record)?
        } else {
            None
        };
        Ok(Outcome::new(label).with_probabilities(probabilities))
    }
}

/// Element type of a declared model input, as far as feeding it goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Int,
    Float,
    Text,
    Other,
}

impl InputKind {
    pub fn from_value_type(value_type: &ValueType) -> Self {
        match value_type {
            ValueType::Tensor { ty, .. } => match ty {
                TensorElementType::Int64 => InputKind::Int,
                TensorElementType::Float32 => InputKind::Float,
                TensorElementType::String => InputKind::Text,
                _ => InputKind::Other,
            },
            _ => InputKind::Other,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, InputKind::Int | InputKind::Float)
    }
}

/// One declared session input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInput {
    pub name: String,
    pub kind: InputKind,
}

impl ModelInput {
    pub fn new(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// How the session expects its features
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLayout {
    /// One float tensor `[1, n_features]` in training order
    Dense { input_name: String },
    /// One `[1, 1]` tensor per feature, named after the feature
    PerColumn { inputs: Vec<ModelInput> },
}

impl InputLayout {
    fn kind_of(&self, feature: &str) -> InputKind {
        match self {
            InputLayout::Dense { .. } => InputKind::Float,
            InputLayout::PerColumn { inputs } => inputs
                .iter()
                .find(|i| i.name == feature)
                .map(|i| i.kind)
                .unwrap_or(InputKind::Other),
        }
    }
}

/// Describe why a feature sent as text (or as a number) cannot feed an input
/// of the given kind. `None` when the pairing works.
pub(crate) fn feed_mismatch(feature: &str, sends_text: bool, kind: InputKind) -> Option<String> {
    let fix = if sends_text {
        CategoricalEncoding::Encoded
    } else {
        CategoricalEncoding::Raw
    };
    if sends_text && kind.is_numeric() {
        Some(format!(
            "input '{}' is numeric but categorical features are raw text; \
             set model.encoding = \"{}\"",
            feature,
            fix.as_str()
        ))
    } else if !sends_text && kind == InputKind::Text {
        if !is_categorical(feature) {
            return Some(format!(
                "input '{}' expects text but the feature is always numeric",
                feature
            ));
        }
        Some(format!(
            "input '{}' expects category text but received integer codes; \
             set model.encoding = \"{}\"",
            feature,
            fix.as_str()
        ))
    } else {
        None
    }
}

/// Raw outputs of one session run
struct RawPrediction {
    label: Option<i64>,
    scores: Option<Vec<f64>>,
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    name: String,
    /// Session runs need exclusive access
    session: Mutex<Session>,
    layout: InputLayout,
    label_output: Option<String>,
    proba_output: Option<String>,
}

impl OnnxClassifier {
    pub(crate) fn new(
        name: String,
        session: Session,
        layout: InputLayout,
        label_output: Option<String>,
        proba_output: Option<String>,
    ) -> Self {
        Self {
            name,
            session: Mutex::new(session),
            layout,
            label_output,
            proba_output,
        }
    }

    /// Whether the model declares a probability output
    pub fn has_probabilities(&self) -> bool {
        self.proba_output.is_some()
    }

    fn run(&self, record: &StructuredRecord, want_scores: bool) -> Result<RawPrediction> {
        let inputs = build_inputs(&self.layout, record)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PredictionError::Inference(format!("Lock error: {}", e)))?;

        let outputs = session.run(inputs)?;

        let label = match &self.label_output {
            Some(name) => {
                let output = outputs.get(name.as_str()).ok_or_else(|| {
                    PredictionError::MalformedOutput(format!("missing output '{}'", name))
                })?;
                Some(extract_label(output)?)
            }
            None => None,
        };

        // The label output alone is enough when probabilities were not asked for
        let scores = match (&self.proba_output, want_scores || label.is_none()) {
            (Some(name), true) => match outputs.get(name.as_str()) {
                Some(output) => Some(extract_scores(output)?),
                None => None,
            },
            _ => None,
        };

        debug!(model = %self.name, label = ?label, scores = ?scores, "Model run complete");

        Ok(RawPrediction { label, scores })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, record: &StructuredRecord) -> Result<i64> {
        let raw = self.run(record, false)?;
        resolve_label(raw.label, raw.scores.as_deref())
    }

    fn predict_proba(&self, record: &StructuredRecord) -> Result<Option<ClassProbabilities>> {
        if !self.has_probabilities() {
            return Ok(None);
        }
        let raw = self.run(record, true)?;
        Ok(raw.scores.as_deref().and_then(ClassProbabilities::from_scores))
    }

    fn assess(&self, record: &StructuredRecord, with_probabilities: bool) -> Result<Outcome> {
        let raw = self.run(record, with_probabilities)?;
        let label = resolve_label(raw.label, raw.scores.as_deref())?;
        let probabilities = if with_probabilities {
            raw.scores.as_deref().and_then(ClassProbabilities::from_scores)
        } else {
            None
        };
        Ok(Outcome::new(label).with_probabilities(probabilities))
    }
}

/// Prefer the model's own label; fall back to the most probable class
fn resolve_label(label: Option<i64>, scores: Option<&[f64]>) -> Result<i64> {
    if let Some(label) = label {
        return Ok(label);
    }
    scores
        .and_then(argmax)
        .map(|idx| idx as i64)
        .ok_or_else(|| PredictionError::MalformedOutput("no label or probabilities".to_string()))
}

fn argmax(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

/// Build session inputs for one record
fn build_inputs(layout: &InputLayout, record: &StructuredRecord) -> Result<Vec<(String, DynValue)>> {
    match layout {
        InputLayout::Dense { input_name } => {
            let features = record.to_dense().ok_or_else(|| {
                PredictionError::Inference(format!(
                    "model takes one numeric input '{}' but categorical features are {} text; \
                     set model.encoding = \"{}\"",
                    input_name,
                    record.encoding.as_str(),
                    CategoricalEncoding::Encoded.as_str()
                ))
            })?;

            // Prepare input tensor - shape [1, num_features]
            let shape = vec![1_i64, features.len() as i64];
            let tensor = Tensor::from_array((shape, features))?;
            Ok(vec![(input_name.clone(), tensor.into_dyn())])
        }
        InputLayout::PerColumn { .. } => {
            let columns = record.columns();

            // Reject the whole record before any tensor is built
            for (name, value) in &columns {
                let sends_text = matches!(value, FeatureValue::Category(_));
                if let Some(reason) = feed_mismatch(name, sends_text, layout.kind_of(name)) {
                    return Err(PredictionError::Inference(reason));
                }
            }

            columns
                .into_iter()
                .map(|(name, value)| -> Result<(String, DynValue)> {
                    let value = match (value, layout.kind_of(name)) {
                        (FeatureValue::Int(v), InputKind::Float) => {
                            Tensor::from_array((vec![1_i64, 1], vec![v as f32]))?.into_dyn()
                        }
                        (FeatureValue::Int(v), _) => {
                            Tensor::from_array((vec![1_i64, 1], vec![v]))?.into_dyn()
                        }
                        (FeatureValue::Category(label), _) => {
                            Tensor::from_string_array((vec![1_i64, 1], &[label][..]))?.into_dyn()
                        }
                    };
                    Ok((name.to_string(), value))
                })
                .collect()
        }
    }
}

/// Extract the predicted label from an int64 tensor output
fn extract_label(output: &DynValue) -> Result<i64> {
    let (_, data) = output.try_extract_tensor::<i64>().map_err(|e| {
        PredictionError::MalformedOutput(format!("label output is not an int64 tensor: {}", e))
    })?;
    data.first()
        .copied()
        .ok_or_else(|| PredictionError::MalformedOutput("empty label output".to_string()))
}

/// Extract per-class probabilities.
///
/// Handles both tensor outputs (`[1, n_classes]`) and `seq(map(int64, float))`
/// outputs, which tree-ensemble converters emit.
fn extract_scores(output: &DynValue) -> Result<Vec<f64>> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        // [batch, n_classes] or [n_classes]; either way the first row
        let n_classes = match shape.len() {
            2 => shape[1] as usize,
            _ => data.len(),
        };
        return Ok(data.iter().take(n_classes).map(|&p| p as f64).collect());
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return extract_from_sequence_map(output);
    }

    Err(PredictionError::MalformedOutput(format!(
        "unsupported probability output type {:?}",
        dtype
    )))
}

/// Extract probabilities from seq(map(int64, float)), ordered by class id
fn extract_from_sequence_map(output: &DynValue) -> Result<Vec<f64>> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| PredictionError::MalformedOutput(format!("not a sequence: {}", e)))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    // Batch size is always 1
    let map_value = maps
        .first()
        .ok_or_else(|| PredictionError::MalformedOutput("empty sequence".to_string()))?;

    let mut kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
    kv_pairs.sort_by_key(|(class_id, _)| *class_id);

    Ok(kv_pairs.into_iter().map(|(_, p)| p as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_encoder::{FeatureEncoder, FEATURE_NAMES};
    use crate::types::request::{AssessmentRequest, MaintenanceLevel, Material};

    fn record(encoding: CategoricalEncoding) -> StructuredRecord {
        FeatureEncoder::new(encoding).encode(&AssessmentRequest::new(
            20,
            5000,
            Material::Concrete,
            MaintenanceLevel::Annual,
        ))
    }

    fn per_column(categorical: InputKind) -> InputLayout {
        InputLayout::PerColumn {
            inputs: FEATURE_NAMES
                .iter()
                .map(|name| {
                    let kind = if is_categorical(name) {
                        categorical
                    } else {
                        InputKind::Int
                    };
                    ModelInput::new(*name, kind)
                })
                .collect(),
        }
    }

    fn inference_message(result: Result<Vec<(String, DynValue)>>) -> String {
        match result {
            Err(PredictionError::Inference(msg)) => msg,
            Err(other) => panic!("expected an inference error, got {other:?}"),
            Ok(_) => panic!("inputs were built for a mismatched record"),
        }
    }

    #[test]
    fn test_dense_model_rejects_raw_text() {
        let layout = InputLayout::Dense {
            input_name: "float_input".to_string(),
        };

        let msg = inference_message(build_inputs(&layout, &record(CategoricalEncoding::Raw)));

        assert!(msg.contains("'float_input'"));
        assert!(msg.contains("model.encoding = \"encoded\""));
    }

    #[test]
    fn test_text_inputs_reject_integer_codes() {
        let layout = per_column(InputKind::Text);

        let msg = inference_message(build_inputs(&layout, &record(CategoricalEncoding::Encoded)));

        assert!(msg.contains("'Material_Type'"));
        assert!(msg.contains("model.encoding = \"raw\""));
    }

    #[test]
    fn test_numeric_inputs_reject_raw_text() {
        let layout = per_column(InputKind::Int);

        let msg = inference_message(build_inputs(&layout, &record(CategoricalEncoding::Raw)));

        assert!(msg.contains("'Material_Type'"));
        assert!(msg.contains("model.encoding = \"encoded\""));
    }

    #[test]
    fn test_feed_mismatch_pairs() {
        assert_eq!(feed_mismatch("Material_Type", true, InputKind::Text), None);
        assert_eq!(feed_mismatch("Material_Type", false, InputKind::Int), None);
        assert_eq!(feed_mismatch("Material_Type", false, InputKind::Float), None);
        assert_eq!(feed_mismatch("Age_of_Bridge", false, InputKind::Other), None);
        assert!(feed_mismatch("Maintenance_Level", true, InputKind::Float).is_some());
        assert!(feed_mismatch("Age_of_Bridge", false, InputKind::Text)
            .is_some_and(|m| m.contains("always numeric")));
    }

    #[test]
    fn test_resolve_label_prefers_model_label() {
        assert_eq!(resolve_label(Some(1), Some(&[0.9, 0.1])).unwrap(), 1);
    }

    #[test]
    fn test_resolve_label_falls_back_to_argmax() {
        assert_eq!(resolve_label(None, Some(&[0.3, 0.7])).unwrap(), 1);
        assert_eq!(resolve_label(None, Some(&[0.6, 0.4])).unwrap(), 0);
        assert!(matches!(
            resolve_label(None, None),
            Err(PredictionError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_argmax_ties_keep_first() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[]), None);
    }
}
