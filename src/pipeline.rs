//! Pipeline orchestration
//!
//! This module provides the public prediction API. It runs one request through
//! the full pipeline against an explicitly supplied model.

use crate::composer::ResultComposer;
use crate::error::{ArtifactError, PredictError};
use crate::features::FeatureDeriver;
use crate::inference::InferenceEngine;
use crate::model::{LoadedModel, ModelSlot};
use crate::mood::mood_for_label;
use crate::schema::{RequestAdapter, SchemaAligner};
use crate::types::{ModelInfo, PredictRequest, PredictionResult};
use std::path::Path;
use uuid::Uuid;

/// Predict the cycle phase and mood for one request.
///
/// Pipeline stages:
/// 1. RequestAdapter - Reject non-finite measurements
/// 2. FeatureDeriver - Compute training-schema features
/// 3. SchemaAligner - Order features into the model's columns
/// 4. InferenceEngine - Run the fitted pipeline
/// 5. Mood mapping - Translate the predicted phase
/// 6. ResultComposer - Build the response
pub fn predict_phase(
    model: &LoadedModel,
    request: &PredictRequest,
) -> Result<PredictionResult, PredictError> {
    RequestAdapter::validate(request)?;
    run_pipeline(model, request)
}

/// Predict from a JSON request, returning the JSON response.
///
/// # Example
/// ```ignore
/// let model = LoadedModel::from_path("phase_prediction_model.json")?;
/// let response = predict_json(&model, request_json)?;
/// ```
pub fn predict_json(model: &LoadedModel, json: &str) -> Result<String, PredictError> {
    let request = RequestAdapter::parse_json(json)?;
    let result = run_pipeline(model, &request)?;
    Ok(serde_json::to_string(&result)?)
}

fn run_pipeline(
    model: &LoadedModel,
    request: &PredictRequest,
) -> Result<PredictionResult, PredictError> {
    let features = FeatureDeriver::derive(request);

    let row = SchemaAligner::align(&features, model.feature_columns());
    if !row.missing_columns().is_empty() {
        tracing::debug!(missing = ?row.missing_columns(), "Columns filled with missing marker");
    }

    let classification = InferenceEngine::new(model).classify(&row)?;

    let mood = mood_for_label(&classification.label).map_err(|e| {
        tracing::error!(label = %classification.label, "Predicted phase has no mood mapping");
        e
    })?;

    let result = ResultComposer::compose(classification, mood, model.label_classes());
    tracing::debug!(
        phase = %result.predicted_phase,
        confidence = result.confidence,
        day_in_cycle = request.day_in_cycle,
        "Prediction complete"
    );
    Ok(result)
}

/// Long-lived predictor holding a model that is installed once.
///
/// Share it across threads behind an `Arc`; predictions only read the model.
#[derive(Debug)]
pub struct PhasePredictor {
    slot: ModelSlot,
    instance_id: String,
}

impl Default for PhasePredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl PhasePredictor {
    /// Create a predictor with no model; predictions fail until one is installed
    pub fn new() -> Self {
        Self {
            slot: ModelSlot::empty(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a predictor around an already loaded model
    pub fn with_model(model: LoadedModel) -> Self {
        Self {
            slot: ModelSlot::loaded(model),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Load an artifact file and create a predictor for it
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Ok(Self::with_model(LoadedModel::from_path(path)?))
    }

    /// Install the model. Fails if one is already installed.
    pub fn install(&self, model: LoadedModel) -> Result<(), ArtifactError> {
        self.slot.install(model)
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_loaded()
    }

    pub fn model(&self) -> Result<&LoadedModel, PredictError> {
        self.slot.get()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Predict for a request. Input errors take precedence over a missing model.
    pub fn predict(&self, request: &PredictRequest) -> Result<PredictionResult, PredictError> {
        RequestAdapter::validate(request)?;
        run_pipeline(self.slot.get()?, request)
    }

    /// Predict from a JSON request, returning the JSON response
    pub fn predict_json(&self, json: &str) -> Result<String, PredictError> {
        let request = RequestAdapter::parse_json(json)?;
        let result = run_pipeline(self.slot.get()?, &request)?;
        Ok(serde_json::to_string(&result)?)
    }

    /// Describe the installed model
    pub fn model_info(&self) -> Result<ModelInfo, PredictError> {
        let model = self.slot.get()?;
        Ok(ModelInfo {
            model_name: model.model_name().to_string(),
            expected_features: model.feature_columns().to_vec(),
            label_classes: model.label_classes().to_vec(),
            source: model.source().to_string(),
            loaded_at: model.loaded_at(),
            instance_id: self.instance_id.clone(),
        })
    }
}
