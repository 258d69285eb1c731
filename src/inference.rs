//! Inference over an aligned row
//!
//! The engine borrows the loaded model and never mutates it, so any number of
//! requests can classify against the same model at once.

use crate::error::PredictError;
use crate::model::{EstimatorError, LoadedModel, ModelSlot};
use crate::schema::AlignedRow;

/// The model's decision for one row
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Predicted class label
    pub label: String,
    /// Position of `label` in the class catalog
    pub index: usize,
    /// Probability per class, in class catalog order
    pub probabilities: Vec<f64>,
}

/// Inference engine over a loaded model
pub struct InferenceEngine<'a> {
    model: &'a LoadedModel,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(model: &'a LoadedModel) -> Self {
        Self { model }
    }

    /// Engine over the slot's model, or `ModelUnavailable` if none is installed
    pub fn from_slot(slot: &'a ModelSlot) -> Result<Self, PredictError> {
        slot.get().map(Self::new)
    }

    pub fn model(&self) -> &'a LoadedModel {
        self.model
    }

    /// Classify one aligned row.
    ///
    /// The predicted label is the first class holding the highest probability.
    pub fn classify(&self, row: &AlignedRow) -> Result<Classification, PredictError> {
        let columns = self.model.feature_columns();
        let probabilities = self
            .model
            .pipeline()
            .predict_proba(row.values(), columns.len())
            .map_err(|e| match e {
                EstimatorError::WidthMismatch { expected, actual } => PredictError::InvalidInput(
                    format!("aligned row has {actual} values, model expects {expected}"),
                ),
                EstimatorError::MissingValue { position } => PredictError::InvalidInput(format!(
                    "feature {} is missing and the pipeline cannot impute it",
                    columns[position]
                )),
                EstimatorError::NonFinite { position } => PredictError::InvalidInput(format!(
                    "feature {} is out of range for the model",
                    columns[position]
                )),
                EstimatorError::NonFiniteOutput => PredictError::InvalidInput(
                    "input is out of range for the model".to_string(),
                ),
            })?;

        let index = argmax(&probabilities);
        Ok(Classification {
            label: self.model.label_classes()[index].clone(),
            index,
            probabilities,
        })
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureDeriver;
    use crate::model::{Classifier, Pipeline};
    use crate::schema::SchemaAligner;
    use crate::testing::{sample_model, sample_request, uniform_model};

    fn classify_day(model: &LoadedModel, day: i64) -> Classification {
        let features = FeatureDeriver::derive(&sample_request(day));
        let row = SchemaAligner::align(&features, model.feature_columns());
        InferenceEngine::new(model).classify(&row).unwrap()
    }

    #[test]
    fn test_phases_follow_cycle_position() {
        let model = sample_model();

        assert_eq!(classify_day(&model, 2).label, "Menstrual");
        assert_eq!(classify_day(&model, 8).label, "Follicular");
        assert_eq!(classify_day(&model, 14).label, "Fertility");
        assert_eq!(classify_day(&model, 22).label, "Luteal");
    }

    #[test]
    fn test_probabilities_cover_catalog() {
        let model = sample_model();
        let result = classify_day(&model, 10);

        assert_eq!(result.probabilities.len(), model.label_classes().len());
        assert!(result.probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!((result.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert_eq!(model.label_classes()[result.index], result.label);
    }

    #[test]
    fn test_ties_resolve_to_first_class() {
        let model = uniform_model();
        let result = classify_day(&model, 5);

        assert_eq!(result.index, 0);
        assert_eq!(result.label, "Menstrual");
        assert!(result.probabilities.iter().all(|p| *p == 0.25));
    }

    #[test]
    fn test_deterministic() {
        let model = sample_model();
        assert_eq!(classify_day(&model, 17), classify_day(&model, 17));
    }

    #[test]
    fn test_wrong_width_is_invalid_input() {
        let model = sample_model();
        let row = AlignedRow::from_values(&["a".to_string()], vec![1.0]);

        let err = InferenceEngine::new(&model).classify(&row).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput(ref m) if m.contains("expects 9")));
    }

    #[test]
    fn test_unimputed_missing_value_names_column() {
        let columns: Vec<String> = ["estrogen", "lh"].iter().map(|s| s.to_string()).collect();
        let pipeline = Pipeline {
            steps: vec![],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![0.1, 0.1], vec![0.0, 0.0]],
                intercept: vec![0.0, 0.0],
            },
        };
        let labels = vec!["Luteal".to_string(), "Menstrual".to_string()];
        let model = LoadedModel::new(pipeline, columns, labels).unwrap();

        let features = FeatureDeriver::derive(&sample_request(3));
        let row = SchemaAligner::align(&features, model.feature_columns());

        let err = InferenceEngine::new(&model).classify(&row).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput(ref m) if m.contains("lh")));
    }

    #[test]
    fn test_overflowing_input_names_column() {
        let model = sample_model();
        let mut request = sample_request(14);
        request.wearable_data.skin_temp = 1e308;

        let features = FeatureDeriver::derive(&request);
        let row = SchemaAligner::align(&features, model.feature_columns());

        let err = InferenceEngine::new(&model).classify(&row).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput(ref m) if m.contains("wrist_temp_mean")));
    }

    #[test]
    fn test_empty_slot() {
        let slot = ModelSlot::empty();
        assert!(matches!(
            InferenceEngine::from_slot(&slot),
            Err(PredictError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_argmax_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), 1);
        assert_eq!(argmax(&[0.7]), 0);
    }
}
