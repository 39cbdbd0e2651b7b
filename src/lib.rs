//! Bridge Condition Predictor Library
//!
//! A single-page web form that scores a bridge's condition (Good or Poor)
//! from four attributes using a pre-trained classifier exported to ONNX.

pub mod config;
pub mod error;
pub mod feature_encoder;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod render;
pub mod server;
pub mod types;

pub use config::{AppConfig, CategoricalEncoding};
pub use error::{InputError, ModelError, PredictionError};
pub use feature_encoder::{FeatureEncoder, StructuredRecord};
pub use handler::FormHandler;
pub use models::{Classifier, ModelState};
pub use types::{AssessmentForm, AssessmentRequest, Condition, Outcome};
