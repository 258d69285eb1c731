//! Result composition
//!
//! This module shapes a classification into the response contract. The label
//! chosen by the inference engine is taken as given: confidence is the largest
//! probability, but the predicted phase is never recomputed from the table.

use crate::inference::Classification;
use crate::mood::Mood;
use crate::types::{PredictionResult, Probabilities};

/// Composer for prediction responses
pub struct ResultComposer;

impl ResultComposer {
    /// Build the response for `classification`.
    ///
    /// `label_classes` is the catalog the probabilities are ordered by.
    pub fn compose(
        classification: Classification,
        mood: Mood,
        label_classes: &[String],
    ) -> PredictionResult {
        let confidence = classification
            .probabilities
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);

        let probabilities: Probabilities = label_classes
            .iter()
            .cloned()
            .zip(classification.probabilities)
            .collect();

        PredictionResult {
            predicted_phase: classification.label,
            predicted_mood: mood.as_str().to_string(),
            confidence,
            probabilities,
        }
    }
}
