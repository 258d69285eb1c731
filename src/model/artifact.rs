//! Model artifact loading
//!
//! An artifact is a JSON document with three required keys: `pipeline`,
//! `feature_columns` and `label_classes`. Loading validates that the three
//! agree with each other so that a bad artifact stops the service at startup
//! instead of failing its first request.

use super::estimator::Pipeline;
use crate::error::ArtifactError;
use crate::features::FEATURE_NAMES;
use crate::mood::Phase;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Display name used when the artifact does not carry one
pub const DEFAULT_MODEL_NAME: &str = "Inner Weather Phase Prediction Model";

#[derive(Deserialize)]
struct RawArtifact {
    pipeline: Option<Pipeline>,
    feature_columns: Option<Vec<String>>,
    label_classes: Option<Vec<String>>,
    model_name: Option<String>,
}

/// A fitted pipeline with its column layout and class catalog
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pipeline: Pipeline,
    feature_columns: Vec<String>,
    label_classes: Vec<String>,
    model_name: String,
    source: String,
    loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    /// Build a model from parts, validating that they agree
    pub fn new(
        pipeline: Pipeline,
        feature_columns: Vec<String>,
        label_classes: Vec<String>,
    ) -> Result<Self, ArtifactError> {
        check_names("feature_columns", &feature_columns)?;
        check_names("label_classes", &label_classes)?;
        pipeline
            .validate(feature_columns.len(), label_classes.len())
            .map_err(ArtifactError::Inconsistent)?;

        Ok(Self {
            pipeline,
            feature_columns,
            label_classes,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            source: "<memory>".to_string(),
            loaded_at: Utc::now(),
        })
    }

    /// Parse and validate an artifact from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let raw: RawArtifact = serde_json::from_str(json)?;

        let pipeline = raw.pipeline.ok_or(ArtifactError::MissingKey("pipeline"))?;
        let feature_columns = raw
            .feature_columns
            .ok_or(ArtifactError::MissingKey("feature_columns"))?;
        let label_classes = raw
            .label_classes
            .ok_or(ArtifactError::MissingKey("label_classes"))?;

        let mut model = Self::new(pipeline, feature_columns, label_classes)?;
        if let Some(name) = raw.model_name {
            model.model_name = name;
        }
        model.log_loaded();
        Ok(model)
    }

    /// Read, parse and validate an artifact file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut model = Self::from_json(&json)?;
        model.source = path.display().to_string();
        Ok(model)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Feature columns in the order the pipeline expects
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Class labels in the order of the pipeline's probability output
    pub fn label_classes(&self) -> &[String] {
        &self.label_classes
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Classes the model can emit that have no mood mapping
    pub fn unmapped_classes(&self) -> Vec<&str> {
        self.label_classes
            .iter()
            .map(String::as_str)
            .filter(|label| label.parse::<Phase>().is_err())
            .collect()
    }

    /// Columns no request can ever supply a value for
    pub fn underivable_columns(&self) -> Vec<&str> {
        self.feature_columns
            .iter()
            .map(String::as_str)
            .filter(|column| !FEATURE_NAMES.contains(column))
            .collect()
    }

    fn log_loaded(&self) {
        tracing::info!(
            model = %self.model_name,
            features = self.feature_columns.len(),
            classes = ?self.label_classes,
            classifier = self.pipeline.classifier.name(),
            "Model loaded"
        );

        let unmapped = self.unmapped_classes();
        if !unmapped.is_empty() {
            tracing::warn!(?unmapped, "Model classes have no mood mapping");
        }

        let underivable = self.underivable_columns();
        if !underivable.is_empty() {
            tracing::warn!(
                ?underivable,
                "Model expects columns that are never derived; they will always be missing"
            );
        }
    }
}

fn check_names(key: &'static str, names: &[String]) -> Result<(), ArtifactError> {
    if names.is_empty() {
        return Err(ArtifactError::Inconsistent(format!("{key} is empty")));
    }
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(ArtifactError::Inconsistent(format!(
                "{key} contains duplicate entry {name:?}"
            )));
        }
    }
    Ok(())
}
