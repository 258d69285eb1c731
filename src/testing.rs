//! Shared fixtures for unit tests

use crate::features::FEATURE_NAMES;
use crate::model::{Classifier, LoadedModel, Pipeline};
use crate::types::{HormoneData, PredictRequest, WearableData};

pub(crate) fn sample_artifact_json() -> &'static str {
    include_str!("../tests/fixtures/phase_model.json")
}

pub(crate) fn sample_model() -> LoadedModel {
    LoadedModel::from_json(sample_artifact_json()).unwrap()
}

fn columns() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn logistic_model(labels: &[&str], intercept: Vec<f64>) -> LoadedModel {
    let n = FEATURE_NAMES.len();
    let pipeline = Pipeline {
        steps: vec![crate::model::Transform::SimpleImputer {
            statistics: vec![0.0; n],
        }],
        classifier: Classifier::LogisticRegression {
            coef: vec![vec![0.0; n]; labels.len()],
            intercept,
        },
    };
    LoadedModel::new(
        pipeline,
        columns(),
        labels.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
}

/// Every class gets probability 0.25 regardless of input
pub(crate) fn uniform_model() -> LoadedModel {
    logistic_model(&["Menstrual", "Follicular", "Fertility", "Luteal"], vec![0.0; 4])
}

/// The winning class is missing from the mood table
pub(crate) fn drifted_model() -> LoadedModel {
    logistic_model(
        &["Menstrual", "Follicular", "Ovulatory", "Luteal"],
        vec![0.0, 0.0, 3.0, 0.0],
    )
}

pub(crate) fn sample_request(day_in_cycle: i64) -> PredictRequest {
    PredictRequest {
        wearable_data: WearableData {
            spo2: 97.0,
            gsr_mean: 5.2,
            gsr_phasic_std: 0.35,
            ppg_rmssd: 45.0,
            heart_rate: 66.0,
            skin_temp: 33.0,
        },
        hormone_data: HormoneData {
            estrogen: 150.0,
            progesterone: 4.25,
        },
        day_in_cycle,
    }
}
