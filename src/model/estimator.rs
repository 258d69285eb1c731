//! Fitted estimator steps
//!
//! A pipeline is a list of fitted preprocessing transforms followed by one
//! fitted classifier. All parameters come from the artifact; nothing here is
//! trained or updated at inference time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while running a row through a pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("expected {expected} features, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("feature at position {position} is missing and no step fills it")]
    MissingValue { position: usize },

    #[error("feature at position {position} is not finite after preprocessing")]
    NonFinite { position: usize },

    #[error("classifier produced non-finite probabilities")]
    NonFiniteOutput,
}

/// A fitted preprocessing transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    /// Replace missing values with a per-column statistic
    SimpleImputer { statistics: Vec<f64> },
    /// Standardize to zero mean and unit variance
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Transform::SimpleImputer { .. } => "simple_imputer",
            Transform::StandardScaler { .. } => "standard_scaler",
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Transform::SimpleImputer { statistics } => statistics.len(),
            Transform::StandardScaler { mean, .. } => mean.len(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Transform::SimpleImputer { statistics } => {
                if let Some(i) = statistics.iter().position(|s| !s.is_finite()) {
                    return Err(format!("simple_imputer statistic {i} is not finite"));
                }
            }
            Transform::StandardScaler { mean, scale } => {
                if mean.len() != scale.len() {
                    return Err(format!(
                        "standard_scaler has {} means but {} scales",
                        mean.len(),
                        scale.len()
                    ));
                }
                if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
                    return Err(format!("standard_scaler mean {i} is not finite"));
                }
                if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s < 0.0) {
                    return Err(format!(
                        "standard_scaler scale {i} must be finite and non-negative"
                    ));
                }
            }
        }
        Ok(())
    }

    fn apply(&self, row: &mut [f64]) {
        match self {
            Transform::SimpleImputer { statistics } => {
                for (x, fill) in row.iter_mut().zip(statistics) {
                    if x.is_nan() {
                        *x = *fill;
                    }
                }
            }
            Transform::StandardScaler { mean, scale } => {
                for ((x, m), s) in row.iter_mut().zip(mean).zip(scale) {
                    // Constant training columns are centred but not scaled
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    *x = (*x - m) / s;
                }
            }
        }
    }
}

/// A fitted decision tree in parallel-array form.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Otherwise a sample goes
/// left when `x[feature[i]] <= threshold[i]`. `value[i]` holds the class
/// weights at node `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

const LEAF: i64 = -1;

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("tree arrays have different lengths".to_string());
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if (left == LEAF) != (right == LEAF) {
                return Err(format!("node {i} has exactly one child"));
            }
            if left == LEAF {
                let weights = &self.value[i];
                if weights.len() != n_classes {
                    return Err(format!(
                        "leaf {i} has {} class weights, expected {n_classes}",
                        weights.len()
                    ));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0)
                    || weights.iter().sum::<f64>() <= 0.0
                {
                    return Err(format!("leaf {i} has invalid class weights"));
                }
                continue;
            }
            // Children always come after their parent, which rules out cycles
            for child in [left, right] {
                if child <= i as i64 || child >= n as i64 {
                    return Err(format!("node {i} has out-of-order child {child}"));
                }
            }
            let feature = self.feature[i];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {i} splits on unknown feature {feature}"));
            }
            if !self.threshold[i].is_finite() {
                return Err(format!("node {i} has a non-finite threshold"));
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf `x` falls into
    fn leaf_distribution(&self, x: &[f64]) -> Vec<f64> {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        weights.iter().map(|w| w / total).collect()
    }
}

/// A fitted probabilistic classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    /// Multinomial logistic regression. A single coefficient row is the
    /// binary form, scoring the second class.
    LogisticRegression {
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    /// Averaged probabilities of independently fitted trees
    RandomForest { trees: Vec<DecisionTree> },
}

impl Classifier {
    pub fn name(&self) -> &'static str {
        match self {
            Classifier::LogisticRegression { .. } => "logistic_regression",
            Classifier::RandomForest { .. } => "random_forest",
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        match self {
            Classifier::LogisticRegression { coef, intercept } => {
                let expected_rows = if n_classes == 2 && coef.len() == 1 {
                    1
                } else {
                    n_classes
                };
                if coef.len() != expected_rows {
                    return Err(format!(
                        "logistic_regression has {} coefficient rows for {n_classes} classes",
                        coef.len()
                    ));
                }
                if intercept.len() != coef.len() {
                    return Err(format!(
                        "logistic_regression has {} intercepts for {} coefficient rows",
                        intercept.len(),
                        coef.len()
                    ));
                }
                if let Some(row) = coef.iter().position(|r| r.len() != n_features) {
                    return Err(format!(
                        "logistic_regression coefficient row {row} has {} weights, expected {n_features}",
                        coef[row].len()
                    ));
                }
                if let Some(row) = coef.iter().position(|r| r.iter().any(|w| !w.is_finite())) {
                    return Err(format!(
                        "logistic_regression coefficient row {row} has a non-finite weight"
                    ));
                }
                if let Some(i) = intercept.iter().position(|b| !b.is_finite()) {
                    return Err(format!("logistic_regression intercept {i} is not finite"));
                }
                Ok(())
            }
            Classifier::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err("random_forest has no trees".to_string());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n_features, n_classes)
                        .map_err(|e| format!("random_forest tree {i}: {e}"))?;
                }
                Ok(())
            }
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        match self {
            Classifier::LogisticRegression { coef, intercept } => {
                let scores: Vec<f64> = coef
                    .iter()
                    .zip(intercept)
                    .map(|(w, b)| w.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() + b)
                    .collect();
                if scores.len() == 1 {
                    let p = sigmoid(scores[0]);
                    vec![1.0 - p, p]
                } else {
                    softmax(&scores)
                }
            }
            Classifier::RandomForest { trees } => {
                let mut rest = trees.iter();
                let mut total = match rest.next() {
                    Some(first) => first.leaf_distribution(x),
                    None => return Vec::new(),
                };
                for tree in rest {
                    for (acc, p) in total.iter_mut().zip(tree.leaf_distribution(x)) {
                        *acc += p;
                    }
                }
                let n = trees.len() as f64;
                total.iter().map(|p| p / n).collect()
            }
        }
    }
}

/// Fitted preprocessing steps followed by a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub steps: Vec<Transform>,
    pub classifier: Classifier,
}

impl Pipeline {
    /// Check every step against the column and class counts of the artifact
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        for (i, step) in self.steps.iter().enumerate() {
            step.validate()
                .map_err(|e| format!("step {i}: {e}"))?;
            if step.n_features() != n_features {
                return Err(format!(
                    "step {i} ({}) expects {} features, artifact lists {n_features} columns",
                    step.name(),
                    step.n_features()
                ));
            }
        }
        self.classifier.validate(n_features, n_classes)
    }

    /// Run one row through every step and return class probabilities.
    ///
    /// `n_features` is the width the pipeline was validated against.
    pub fn predict_proba(&self, row: &[f64], n_features: usize) -> Result<Vec<f64>, EstimatorError> {
        if row.len() != n_features {
            return Err(EstimatorError::WidthMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }

        let mut x = row.to_vec();
        for step in &self.steps {
            step.apply(&mut x);
        }

        if let Some(position) = x.iter().position(|v| v.is_nan()) {
            return Err(EstimatorError::MissingValue { position });
        }
        // Finite inputs can still overflow in the scaler
        if let Some(position) = x.iter().position(|v| v.is_infinite()) {
            return Err(EstimatorError::NonFinite { position });
        }

        let probabilities = self.classifier.predict_proba(&x);
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(EstimatorError::NonFiniteOutput);
        }
        Ok(probabilities)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> DecisionTree {
        // Split on feature 0 at 0.5; left leaf favours class 0, right class 1
        DecisionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![vec![5.0, 5.0], vec![4.0, 1.0], vec![1.0, 4.0]],
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0, 1000.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_binary_logistic_regression() {
        let pipeline = Pipeline {
            steps: vec![],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![1.0]],
                intercept: vec![0.0],
            },
        };
        pipeline.validate(1, 2).unwrap();

        let p = pipeline.predict_proba(&[0.0], 1).unwrap();
        assert_eq!(p, vec![0.5, 0.5]);

        let p = pipeline.predict_proba(&[3.0], 1).unwrap();
        assert!(p[1] > 0.95);
    }

    #[test]
    fn test_imputer_then_scaler() {
        let pipeline = Pipeline {
            steps: vec![
                Transform::SimpleImputer {
                    statistics: vec![2.0, 7.0],
                },
                Transform::StandardScaler {
                    mean: vec![1.0, 7.0],
                    scale: vec![2.0, 0.0],
                },
            ],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                intercept: vec![0.0, 0.0],
            },
        };
        pipeline.validate(2, 2).unwrap();

        // NaN -> 2.0 -> (2 - 1) / 2 = 0.5 ; 7.0 -> (7 - 7) / 1 = 0
        let p = pipeline.predict_proba(&[f64::NAN, 7.0], 2).unwrap();
        let expected = softmax(&[0.5, 0.0]);
        assert_eq!(p, expected);
    }

    #[test]
    fn test_missing_value_without_imputer() {
        let pipeline = Pipeline {
            steps: vec![],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![1.0, 1.0], vec![0.0, 0.0]],
                intercept: vec![0.0, 0.0],
            },
        };

        let err = pipeline.predict_proba(&[1.0, f64::NAN], 2).unwrap_err();
        assert_eq!(err, EstimatorError::MissingValue { position: 1 });
    }

    #[test]
    fn test_scaler_overflow_is_rejected() {
        let pipeline = Pipeline {
            steps: vec![Transform::StandardScaler {
                mean: vec![0.0, 33.0],
                scale: vec![1.0, 0.5],
            }],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![0.0, 1.0], vec![0.0, 0.0]],
                intercept: vec![0.0, 0.0],
            },
        };

        let err = pipeline.predict_proba(&[1.0, 1e308], 2).unwrap_err();
        assert_eq!(err, EstimatorError::NonFinite { position: 1 });
    }

    #[test]
    fn test_score_overflow_is_rejected() {
        let pipeline = Pipeline {
            steps: vec![],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![1e300, -1e300], vec![0.0, 0.0]],
                intercept: vec![0.0, 0.0],
            },
        };

        // 1e300 * 1e10 overflows to inf and -inf, whose sum is NaN
        let err = pipeline.predict_proba(&[1e10, 1e10], 2).unwrap_err();
        assert_eq!(err, EstimatorError::NonFiniteOutput);
    }

    #[test]
    fn test_non_finite_parameters_are_rejected() {
        let scaler = Transform::StandardScaler {
            mean: vec![f64::NAN],
            scale: vec![1.0],
        };
        assert!(scaler.validate().unwrap_err().contains("mean 0"));

        let scaler = Transform::StandardScaler {
            mean: vec![0.0],
            scale: vec![-2.0],
        };
        assert!(scaler.validate().unwrap_err().contains("scale 0"));

        let classifier = Classifier::LogisticRegression {
            coef: vec![vec![f64::INFINITY], vec![0.0]],
            intercept: vec![0.0, 0.0],
        };
        assert!(classifier.validate(1, 2).unwrap_err().contains("non-finite weight"));

        let classifier = Classifier::LogisticRegression {
            coef: vec![vec![1.0], vec![0.0]],
            intercept: vec![f64::NAN, 0.0],
        };
        assert!(classifier.validate(1, 2).unwrap_err().contains("intercept 0"));

        let mut tree = stump();
        tree.threshold[0] = f64::NAN;
        let classifier = Classifier::RandomForest { trees: vec![tree] };
        assert!(classifier.validate(1, 2).unwrap_err().contains("non-finite threshold"));
    }

    #[test]
    fn test_width_mismatch() {
        let pipeline = Pipeline {
            steps: vec![],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![1.0]],
                intercept: vec![0.0],
            },
        };

        let err = pipeline.predict_proba(&[1.0, 2.0], 1).unwrap_err();
        assert_eq!(err, EstimatorError::WidthMismatch { expected: 1, actual: 2 });
    }

    #[test]
    fn test_random_forest_averages_trees() {
        let pipeline = Pipeline {
            steps: vec![],
            classifier: Classifier::RandomForest {
                trees: vec![stump(), stump()],
            },
        };
        pipeline.validate(1, 2).unwrap();

        assert_eq!(pipeline.predict_proba(&[0.0], 1).unwrap(), vec![0.8, 0.2]);
        assert_eq!(pipeline.predict_proba(&[0.5], 1).unwrap(), vec![0.8, 0.2]);
        assert_eq!(pipeline.predict_proba(&[0.9], 1).unwrap(), vec![0.2, 0.8]);
    }

    #[test]
    fn test_invalid_tree_is_rejected() {
        let mut tree = stump();
        tree.children_left[0] = 0;

        let classifier = Classifier::RandomForest { trees: vec![tree] };
        let err = classifier.validate(1, 2).unwrap_err();
        assert!(err.contains("out-of-order child"));

        let mut tree = stump();
        tree.feature[0] = 3;
        let classifier = Classifier::RandomForest { trees: vec![tree] };
        assert!(classifier.validate(1, 2).unwrap_err().contains("unknown feature"));
    }

    #[test]
    fn test_step_width_must_match_columns() {
        let pipeline = Pipeline {
            steps: vec![Transform::SimpleImputer {
                statistics: vec![0.0; 3],
            }],
            classifier: Classifier::LogisticRegression {
                coef: vec![vec![0.0; 4], vec![0.0; 4]],
                intercept: vec![0.0, 0.0],
            },
        };

        let err = pipeline.validate(4, 2).unwrap_err();
        assert!(err.contains("expects 3 features"));
    }

    #[test]
    fn test_deserialize_tagged_steps() {
        let json = r#"{
            "steps": [{ "type": "standard_scaler", "mean": [0.0], "scale": [1.0] }],
            "classifier": { "type": "logistic_regression", "coef": [[1.0]], "intercept": [0.0] }
        }"#;

        let pipeline: Pipeline = serde_json::from_str(json).unwrap();
        assert_eq!(pipeline.steps[0].name(), "standard_scaler");
        assert_eq!(pipeline.classifier.name(), "logistic_regression");
    }
}
