//! Error types for model loading, form input and inference

use std::path::PathBuf;
use thiserror::Error;

/// Load-time failures. Any of these disables predictions for the process lifetime.
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("Model file not found at {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to load model from {path}: {reason}")]
    Incompatible {
        path: PathBuf,
        reason: String,
        hint: String,
    },
}

impl ModelError {
    /// Diagnostic hint shown next to the error, if any
    pub fn hint(&self) -> Option<&str> {
        match self {
            ModelError::NotFound { .. } => {
                Some("Check that the model file was deployed alongside the service, or set model.path.")
            }
            ModelError::Incompatible { hint, .. } => Some(hint.as_str()),
        }
    }
}

/// Form coercion failures (the server-side equivalent of the input widgets' bounds)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("{field} must be a whole number of 0 or more, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} is too large, got '{value}' (max {})", u32::MAX)]
    OutOfRange { field: &'static str, value: String },

    #[error("Unknown material type '{0}'")]
    UnknownMaterial(String),

    #[error("Unknown maintenance level '{0}'")]
    UnknownMaintenance(String),
}

/// Per-submission inference failures
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Model is not loaded: {0}")]
    ModelUnavailable(#[from] ModelError),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model returned an unexpected output: {0}")]
    MalformedOutput(String),
}

impl From<ort::Error> for PredictionError {
    fn from(e: ort::Error) -> Self {
        PredictionError::Inference(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PredictionError>;
