//! ONNX model loader

use crate::config::{CategoricalEncoding, ModelConfig};
use crate::error::ModelError;
use crate::feature_encoder::{is_categorical, FEATURE_NAMES};
use crate::models::inference::{feed_mismatch, InputKind, InputLayout, ModelInput, OnnxClassifier};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{info, warn};

/// Loader for the bridge condition model
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    /// Categorical encoding the model is expected to consume
    encoding: CategoricalEncoding,
}

impl ModelLoader {
    /// Create a loader from model configuration
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            onnx_threads: config.onnx_threads.max(1),
            encoding: config.encoding,
        }
    }

    /// Load the model from file.
    ///
    /// The file is checked before ONNX Runtime is touched, so a missing
    /// artifact never needs the runtime to be available.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<OnnxClassifier, ModelError> {
        let path = path.as_ref();

        if !path.is_file() {
            warn!(path = %path.display(), "Model file not found");
            return Err(ModelError::NotFound {
                path: path.to_path_buf(),
            });
        }

        info!(
            path = %path.display(),
            threads = self.onnx_threads,
            encoding = self.encoding.as_str(),
            "Loading ONNX model"
        );

        let session = self.build_session(path).map_err(|e| {
            let reason = e.to_string();
            ModelError::Incompatible {
                path: path.to_path_buf(),
                hint: diagnose(&reason).to_string(),
                reason,
            }
        })?;

        let inputs: Vec<ModelInput> = session
            .inputs
            .iter()
            .map(|i| ModelInput::new(i.name.clone(), InputKind::from_value_type(&i.input_type)))
            .collect();
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        let layout = resolve_layout(&inputs);
        for warning in layout_warnings(&layout, self.encoding) {
            warn!(
                encoding = self.encoding.as_str(),
                "{}; predictions will fail until this is fixed", warning
            );
        }

        let label_output = output_names.iter().find(|n| n.contains("label")).cloned();
        let proba_output = output_names
            .iter()
            .find(|n| n.contains("prob"))
            .or_else(|| output_names.iter().find(|n| !n.contains("label")))
            .cloned();

        if label_output.is_none() && proba_output.is_none() {
            return Err(ModelError::Incompatible {
                path: path.to_path_buf(),
                reason: "model declares no outputs".to_string(),
                hint: "Export the classifier with its label output.".to_string(),
            });
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        info!(
            model = %name,
            inputs = ?inputs,
            label_output = ?label_output,
            proba_output = ?proba_output,
            "Model loaded successfully"
        );

        Ok(OnnxClassifier::new(
            name,
            session,
            layout,
            label_output,
            proba_output,
        ))
    }

    fn build_session(&self, path: &Path) -> ort::Result<Session> {
        ort::init().commit()?;
        Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(&ModelConfig::default())
    }
}

/// Work out how the model wants its features fed.
///
/// One input means a dense `[1, 4]` tensor; otherwise one input per named feature.
pub(crate) fn resolve_layout(inputs: &[ModelInput]) -> InputLayout {
    let per_column = FEATURE_NAMES
        .iter()
        .all(|f| inputs.iter().any(|i| i.name == *f));

    if inputs.len() > 1 && per_column {
        InputLayout::PerColumn {
            inputs: inputs.to_vec(),
        }
    } else {
        InputLayout::Dense {
            input_name: inputs
                .first()
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "float_input".to_string()),
        }
    }
}

/// Every way the configured encoding cannot feed the model's declared inputs
pub(crate) fn layout_warnings(layout: &InputLayout, encoding: CategoricalEncoding) -> Vec<String> {
    match layout {
        InputLayout::Dense { input_name } => match encoding {
            CategoricalEncoding::Raw => vec![format!(
                "model takes a single dense input '{}' but model.encoding is \"raw\"; \
                 set model.encoding = \"encoded\"",
                input_name
            )],
            CategoricalEncoding::Encoded => Vec::new(),
        },
        InputLayout::PerColumn { inputs } => inputs
            .iter()
            .filter(|i| FEATURE_NAMES.contains(&i.name.as_str()))
            .filter_map(|i| {
                let sends_text =
                    encoding == CategoricalEncoding::Raw && is_categorical(&i.name);
                feed_mismatch(&i.name, sends_text, i.kind)
            })
            .collect(),
    }
}

/// Map a runtime load error to an actionable hint
pub(crate) fn diagnose(reason: &str) -> &'static str {
    let lower = reason.to_lowercase();
    if lower.contains("opset") || lower.contains("ir version") || lower.contains("version") {
        "The model was exported for a different ONNX opset or IR version than this runtime \
         supports. Re-export it with a matching target opset or upgrade ONNX Runtime."
    } else if lower.contains("protobuf") || lower.contains("parse") || lower.contains("invalid") {
        "The file is not a valid ONNX model. Convert the trained classifier to ONNX before \
         deploying it."
    } else {
        "The model could not be initialised by ONNX Runtime. Check that it was exported from \
         the same training run and library versions the service expects."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn inputs(v: &[(&str, InputKind)]) -> Vec<ModelInput> {
        v.iter().map(|(name, kind)| ModelInput::new(*name, *kind)).collect()
    }

    fn bridge_inputs(categorical: InputKind) -> Vec<ModelInput> {
        inputs(&[
            ("Age_of_Bridge", InputKind::Int),
            ("Traffic_Volume", InputKind::Int),
            ("Material_Type", categorical),
            ("Maintenance_Level", categorical),
        ])
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let loader = ModelLoader::default();
        let dir = tempfile::tempdir().unwrap();

        let result = loader.load_model(dir.path().join("model.onnx"));

        assert!(matches!(result, Err(ModelError::NotFound { .. })));
    }

    #[test]
    fn test_directory_is_not_a_model() {
        let loader = ModelLoader::default();
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            loader.load_model(dir.path()),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_incompatible_with_hint() {
        let loader = ModelLoader::default();
        let mut file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
        file.write_all(b"this is a pickled estimator, not an onnx graph")
            .unwrap();

        match loader.load_model(file.path()) {
            Err(err @ ModelError::Incompatible { .. }) => {
                assert!(err.hint().is_some_and(|h| !h.is_empty()));
            }
            Err(other) => panic!("expected Incompatible, got {other:?}"),
            Ok(_) => panic!("garbage file loaded as a model"),
        }
    }

    #[test]
    fn test_single_input_is_dense() {
        let layout = resolve_layout(&inputs(&[("float_input", InputKind::Float)]));
        assert_eq!(
            layout,
            InputLayout::Dense {
                input_name: "float_input".to_string()
            }
        );
    }

    #[test]
    fn test_named_inputs_are_per_column() {
        let layout = resolve_layout(&bridge_inputs(InputKind::Text));
        assert_eq!(
            layout,
            InputLayout::PerColumn {
                inputs: bridge_inputs(InputKind::Text)
            }
        );

        // Partial naming falls back to the first input
        let layout = resolve_layout(&inputs(&[
            ("Age_of_Bridge", InputKind::Int),
            ("other", InputKind::Int),
        ]));
        assert!(matches!(layout, InputLayout::Dense { .. }));
    }

    #[test]
    fn test_dense_layout_warns_only_for_raw() {
        let layout = InputLayout::Dense {
            input_name: "float_input".to_string(),
        };

        assert!(layout_warnings(&layout, CategoricalEncoding::Encoded).is_empty());
        let warnings = layout_warnings(&layout, CategoricalEncoding::Raw);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("model.encoding = \"encoded\""));
    }

    #[test]
    fn test_text_categoricals_need_raw_encoding() {
        let layout = resolve_layout(&bridge_inputs(InputKind::Text));

        assert!(layout_warnings(&layout, CategoricalEncoding::Raw).is_empty());
        let warnings = layout_warnings(&layout, CategoricalEncoding::Encoded);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'Material_Type'"));
        assert!(warnings[1].contains("'Maintenance_Level'"));
        assert!(warnings.iter().all(|w| w.contains("model.encoding = \"raw\"")));
    }

    #[test]
    fn test_numeric_categoricals_need_encoded_encoding() {
        for kind in [InputKind::Int, InputKind::Float] {
            let layout = resolve_layout(&bridge_inputs(kind));

            assert!(layout_warnings(&layout, CategoricalEncoding::Encoded).is_empty());
            let warnings = layout_warnings(&layout, CategoricalEncoding::Raw);
            assert_eq!(warnings.len(), 2);
            assert!(warnings.iter().all(|w| w.contains("model.encoding = \"encoded\"")));
        }
    }

    #[test]
    fn test_text_numeric_feature_always_warns() {
        let layout = resolve_layout(&inputs(&[
            ("Age_of_Bridge", InputKind::Text),
            ("Traffic_Volume", InputKind::Int),
            ("Material_Type", InputKind::Text),
            ("Maintenance_Level", InputKind::Text),
        ]));

        let warnings = layout_warnings(&layout, CategoricalEncoding::Raw);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'Age_of_Bridge'"));
    }

    #[test]
    fn test_diagnose_version_mismatch() {
        let hint = diagnose("Unsupported model IR version: 10, max supported IR version: 9");
        assert!(hint.contains("opset"));

        let hint = diagnose("Protobuf parsing failed.");
        assert!(hint.contains("not a valid ONNX model"));
    }
}
