//! Core types for the Inner Weather pipeline
//!
//! This module defines the data structures that cross the pipeline boundary:
//! the raw measurements a caller submits, the prediction returned for them, and
//! the read-only model description exposed for introspection.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Wearable sensor readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WearableData {
    /// Blood oxygen saturation (percentage)
    pub spo2: f64,
    /// Galvanic skin response, mean level
    pub gsr_mean: f64,
    /// Galvanic skin response, phasic component standard deviation
    pub gsr_phasic_std: f64,
    /// Heart rate variability from PPG (RMSSD, ms)
    pub ppg_rmssd: f64,
    /// Heart rate (bpm)
    pub heart_rate: f64,
    /// Skin temperature (celsius)
    pub skin_temp: f64,
}

/// Hormone readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HormoneData {
    pub estrogen: f64,
    pub progesterone: f64,
}

/// A single prediction request: the raw measurements for one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub wearable_data: WearableData,
    pub hormone_data: HormoneData,
    /// Day in the menstrual cycle (1-based, not bounded)
    #[serde(deserialize_with = "deserialize_day")]
    pub day_in_cycle: i64,
}

/// Accept integers and integral floats such as `14.0`; reject `9.5`
fn deserialize_day<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(day) = number.as_i64() {
        return Ok(day);
    }
    match number.as_f64() {
        Some(day) if day.fract() == 0.0 && day.abs() <= 9_007_199_254_740_992.0 => Ok(day as i64),
        _ => Err(D::Error::custom(format!(
            "day_in_cycle must be a whole number, got {number}"
        ))),
    }
}

impl PredictRequest {
    /// Named numeric fields, used for validation and diagnostics
    pub fn numeric_fields(&self) -> [(&'static str, f64); 8] {
        let w = &self.wearable_data;
        let h = &self.hormone_data;
        [
            ("wearable_data.spo2", w.spo2),
            ("wearable_data.gsr_mean", w.gsr_mean),
            ("wearable_data.gsr_phasic_std", w.gsr_phasic_std),
            ("wearable_data.ppg_rmssd", w.ppg_rmssd),
            ("wearable_data.heart_rate", w.heart_rate),
            ("wearable_data.skin_temp", w.skin_temp),
            ("hormone_data.estrogen", h.estrogen),
            ("hormone_data.progesterone", h.progesterone),
        ]
    }
}

/// Class probabilities keyed by label, kept in class catalog order
pub type Probabilities = IndexMap<String, f64>;

/// The result of one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted menstrual phase (member of the class catalog)
    pub predicted_phase: String,
    /// Mood descriptor derived from the phase
    pub predicted_mood: String,
    /// Maximum class probability
    pub confidence: f64,
    /// Probability for every class in the catalog
    pub probabilities: Probabilities,
}

/// Read-only description of the loaded model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    /// Feature columns in the order the pipeline expects them
    pub expected_features: Vec<String>,
    pub label_classes: Vec<String>,
    /// Artifact path, or `<memory>` for artifacts parsed from a string
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub instance_id: String,
}
