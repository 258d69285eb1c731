//! Column alignment
//!
//! The fitted pipeline consumes a plain numeric row, so the position of each
//! value is its only identity. The aligner lays the derived features out in the
//! exact order the model was trained with.

use crate::features::{FeatureVector, MISSING};

/// A single input row ordered to match the model's expected columns
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    values: Vec<f64>,
    missing: Vec<String>,
}

impl AlignedRow {
    /// Build a row directly from values, recording NaN entries as missing
    pub fn from_values(columns: &[String], values: Vec<f64>) -> Self {
        let missing = columns
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_nan())
            .map(|(c, _)| c.clone())
            .collect();
        Self { values, missing }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Columns that carry the missing marker
    pub fn missing_columns(&self) -> &[String] {
        &self.missing
    }
}

/// Aligner from named features to the model's column order
pub struct SchemaAligner;

impl SchemaAligner {
    /// Lay out `features` in `columns` order.
    ///
    /// Columns the feature vector does not know receive the missing marker.
    /// Features not named in `columns` are dropped.
    pub fn align(features: &FeatureVector, columns: &[String]) -> AlignedRow {
        let mut values = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();

        for column in columns {
            match features.get(column) {
                Some(value) if !value.is_missing() => values.push(value.to_f64()),
                _ => {
                    values.push(MISSING);
                    missing.push(column.clone());
                }
            }
        }

        AlignedRow { values, missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureDeriver, FEATURE_NAMES};
    use crate::types::{HormoneData, PredictRequest, WearableData};

    fn make_features() -> FeatureVector {
        FeatureDeriver::derive(&PredictRequest {
            wearable_data: WearableData {
                spo2: 96.0,
                gsr_mean: 4.0,
                gsr_phasic_std: 0.2,
                ppg_rmssd: 50.0,
                heart_rate: 64.0,
                skin_temp: 32.8,
            },
            hormone_data: HormoneData {
                estrogen: 90.0,
                progesterone: 8.0,
            },
            day_in_cycle: 21,
        })
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_align_follows_column_order() {
        let features = make_features();
        let cols = columns(&["pdg", "estrogen", "day_in_study"]);

        let row = SchemaAligner::align(&features, &cols);
        assert_eq!(row.values(), &[8.0, 90.0, 21.0]);
        assert!(row.missing_columns().is_empty());
    }

    #[test]
    fn test_align_full_vocabulary() {
        let features = make_features();
        let cols = columns(&FEATURE_NAMES);

        let row = SchemaAligner::align(&features, &cols);
        assert_eq!(row.len(), FEATURE_NAMES.len());
        assert!(row.values()[6].is_nan());
        assert_eq!(row.missing_columns(), &["lh".to_string()]);
    }

    #[test]
    fn test_unknown_column_is_missing() {
        let features = make_features();
        let cols = columns(&["rmssd_mean", "resting_hr", "pdg"]);

        let row = SchemaAligner::align(&features, &cols);
        assert_eq!(row.len(), 3);
        assert_eq!(row.values()[0], 50.0);
        assert!(row.values()[1].is_nan());
        assert_eq!(row.values()[2], 8.0);
        assert_eq!(row.missing_columns(), &["resting_hr".to_string()]);
    }

    #[test]
    fn test_empty_columns() {
        let row = SchemaAligner::align(&make_features(), &[]);
        assert!(row.is_empty());
    }

    #[test]
    fn test_from_values_tracks_missing() {
        let cols = columns(&["a", "b"]);
        let row = AlignedRow::from_values(&cols, vec![1.0, f64::NAN]);
        assert_eq!(row.missing_columns(), &["b".to_string()]);
    }
}
