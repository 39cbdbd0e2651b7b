//! ML model loading and inference components

pub mod inference;
pub mod loader;

pub use inference::{Classifier, InputLayout, OnnxClassifier};
pub use loader::ModelLoader;

use crate::config::ModelConfig;
use crate::error::ModelError;
use std::sync::Arc;
use tracing::{error, info};

/// Process-wide model handle, resolved once at startup and never mutated.
#[derive(Clone)]
pub enum ModelState {
    /// Model loaded; predictions enabled
    Ready(Arc<dyn Classifier>),
    /// Load failed; predictions disabled for the process lifetime
    Unavailable(ModelError),
}

impl ModelState {
    /// Load the configured model, capturing any failure instead of propagating it
    pub fn load(config: &ModelConfig) -> Self {
        let loader = ModelLoader::new(config);
        match loader.load_model(&config.path) {
            Ok(model) => {
                info!(model = %model.name(), "Predictions enabled");
                ModelState::Ready(Arc::new(model))
            }
            Err(e) => {
                error!(
                    error = %e,
                    hint = e.hint().unwrap_or_default(),
                    "Model unavailable, predictions disabled"
                );
                ModelState::Unavailable(e)
            }
        }
    }

    /// Wrap an already constructed classifier
    pub fn ready<C: Classifier + 'static>(classifier: C) -> Self {
        ModelState::Ready(Arc::new(classifier))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    /// The loaded classifier, or the reason there is none
    pub fn classifier(&self) -> Result<&Arc<dyn Classifier>, ModelError> {
        match self {
            ModelState::Ready(model) => Ok(model),
            ModelState::Unavailable(e) => Err(e.clone()),
        }
    }

    /// Load error, if any
    pub fn load_error(&self) -> Option<&ModelError> {
        match self {
            ModelState::Ready(_) => None,
            ModelState::Unavailable(e) => Some(e),
        }
    }

    pub fn status(&self) -> &'static str {
        if self.is_ready() {
            "ready"
        } else {
            "unavailable"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_disables_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            path: dir.path().join("model.onnx").to_string_lossy().into_owned(),
            ..ModelConfig::default()
        };

        let state = ModelState::load(&config);

        assert!(!state.is_ready());
        assert_eq!(state.status(), "unavailable");
        assert!(matches!(
            state.classifier(),
            Err(ModelError::NotFound { .. })
        ));
        assert!(state.load_error().is_some());
    }
}
