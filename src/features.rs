//! Feature derivation
//!
//! This module derives the model's training features from raw measurements:
//! - Cyclical encoding of the cycle day on a nominal 28-day period
//! - Direct passthrough of wearable and hormone readings
//! - Proxy features where the training schema names a signal we do not measure

use crate::types::PredictRequest;
use std::f64::consts::PI;

/// Period used for the cyclical cycle-day encoding.
///
/// Every individual is placed on the same nominal 28-day cycle regardless of
/// their actual cycle length. The model was trained on this encoding, so it
/// must not be adjusted per user.
pub const CYCLE_PERIOD_DAYS: f64 = 28.0;

/// Marker for a feature that has no value.
///
/// The imputation step of the fitted pipeline recognises NaN as missing.
pub const MISSING: f64 = f64::NAN;

/// Names of every feature the deriver produces, in derivation order
pub const FEATURE_NAMES: [&str; 9] = [
    "day_in_study",
    "cycle_sin_28",
    "cycle_cos_28",
    "rmssd_mean",
    "stress_score_mean",
    "wrist_temp_mean",
    "lh",
    "estrogen",
    "pdg",
];

/// A single feature value, or an explicit missing marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Value(f64),
    Missing,
}

impl FeatureValue {
    /// Numeric form, with `Missing` encoded as [`MISSING`]
    pub fn to_f64(self) -> f64 {
        match self {
            FeatureValue::Value(v) => v,
            FeatureValue::Missing => MISSING,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

/// Features derived from one request, matching the training schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub day_in_study: f64,
    pub cycle_sin_28: f64,
    pub cycle_cos_28: f64,
    pub rmssd_mean: f64,
    pub stress_score_mean: f64,
    pub wrist_temp_mean: f64,
    /// Luteinizing hormone. No input carries it, so it is always missing.
    pub lh: FeatureValue,
    pub estrogen: f64,
    pub pdg: f64,
}

impl FeatureVector {
    /// Look up a feature by its training-schema name
    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        let value = match name {
            "day_in_study" => FeatureValue::Value(self.day_in_study),
            "cycle_sin_28" => FeatureValue::Value(self.cycle_sin_28),
            "cycle_cos_28" => FeatureValue::Value(self.cycle_cos_28),
            "rmssd_mean" => FeatureValue::Value(self.rmssd_mean),
            "stress_score_mean" => FeatureValue::Value(self.stress_score_mean),
            "wrist_temp_mean" => FeatureValue::Value(self.wrist_temp_mean),
            "lh" => self.lh,
            "estrogen" => FeatureValue::Value(self.estrogen),
            "pdg" => FeatureValue::Value(self.pdg),
            _ => return None,
        };
        Some(value)
    }
}

/// Feature deriver for computing model features from raw measurements
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive features from a request.
    ///
    /// `spo2`, `heart_rate` and `gsr_phasic_std` are accepted by the request
    /// contract but are not part of the current feature set.
    pub fn derive(request: &PredictRequest) -> FeatureVector {
        let wearable = &request.wearable_data;
        let hormone = &request.hormone_data;
        let (cycle_sin_28, cycle_cos_28) = cycle_position(request.day_in_cycle);

        FeatureVector {
            day_in_study: request.day_in_cycle as f64,
            cycle_sin_28,
            cycle_cos_28,
            rmssd_mean: wearable.ppg_rmssd,
            // No stress metric is measured; GSR level stands in for it
            stress_score_mean: wearable.gsr_mean,
            wrist_temp_mean: wearable.skin_temp,
            lh: FeatureValue::Missing,
            estrogen: hormone.estrogen,
            pdg: hormone.progesterone,
        }
    }
}

/// Sine/cosine encoding of the cycle day on the nominal period
fn cycle_position(day_in_cycle: i64) -> (f64, f64) {
    let angle = 2.0 * PI * day_in_cycle as f64 / CYCLE_PERIOD_DAYS;
    (angle.sin(), angle.cos())
}
