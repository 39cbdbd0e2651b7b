//! Inference form handler: collect, encode, predict.
//!
//! Each submission is independent. The handler holds only read-only state
//! (the loaded model and encoder settings) and never remembers a request.

use crate::config::AppConfig;
use crate::error::{InputError, PredictionError};
use crate::feature_encoder::FeatureEncoder;
use crate::metrics::PredictionMetrics;
use crate::models::{Classifier, ModelState};
use crate::types::outcome::Outcome;
use crate::types::request::{collect_input, AssessmentForm, AssessmentRequest};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why a submission produced no verdict
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl SubmissionError {
    /// True when the model was never loaded (predictions disabled)
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SubmissionError::Prediction(PredictionError::ModelUnavailable(_))
        )
    }
}

/// Handles form submissions against the process-wide model
pub struct FormHandler {
    model: ModelState,
    encoder: FeatureEncoder,
    show_probabilities: bool,
    metrics: Arc<PredictionMetrics>,
}

impl FormHandler {
    pub fn new(
        model: ModelState,
        encoder: FeatureEncoder,
        show_probabilities: bool,
        metrics: Arc<PredictionMetrics>,
    ) -> Self {
        Self {
            model,
            encoder,
            show_probabilities,
            metrics,
        }
    }

    /// Build a handler from configuration around an already resolved model
    pub fn from_config(config: &AppConfig, model: ModelState, metrics: Arc<PredictionMetrics>) -> Self {
        Self::new(
            model,
            FeatureEncoder::new(config.model.encoding),
            config.display.show_probabilities,
            metrics,
        )
    }

    pub fn model(&self) -> &ModelState {
        &self.model
    }

    pub fn metrics(&self) -> &Arc<PredictionMetrics> {
        &self.metrics
    }

    /// Whether the submit action should be offered at all
    pub fn predictions_enabled(&self) -> bool {
        self.model.is_ready()
    }

    /// Full cycle for one posted form
    pub fn submit(&self, form: &AssessmentForm) -> Result<Outcome, SubmissionError> {
        let request = collect_input(form).inspect_err(|e| {
            warn!(error = %e, "Rejected form input");
            self.metrics.record_input_error();
        })?;

        Ok(self.predict(&request)?)
    }

    /// Encode a request and run it through the model
    pub fn predict(&self, request: &AssessmentRequest) -> Result<Outcome, PredictionError> {
        let classifier = self.model.classifier()?;

        let record = self.encoder.encode(request);
        debug!(
            age = record.age_of_bridge,
            traffic = record.traffic_volume,
            material = %record.material_type,
            maintenance = %record.maintenance_level,
            encoding = record.encoding.as_str(),
            "Running assessment"
        );

        let start = Instant::now();
        match classifier.assess(&record, self.show_probabilities) {
            Ok(outcome) => {
                let elapsed = start.elapsed();
                self.metrics.record_prediction(elapsed, outcome.condition);
                info!(
                    model = %classifier.name(),
                    label = outcome.label,
                    condition = ?outcome.condition,
                    p_poor = outcome.probabilities.map(|p| p.poor),
                    processing_time_us = elapsed.as_micros() as u64,
                    assessed_at = %outcome.assessed_at.to_rfc3339(),
                    "Assessment complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.record_failure();
                error!(model = %classifier.name(), error = %e, "Inference failed");
                Err(e)
            }
        }
    }
}
