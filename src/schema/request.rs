//! Request payload parsing and validation

use crate::error::PredictError;
use crate::types::PredictRequest;

/// Adapter for turning request payloads into validated [`PredictRequest`]s
pub struct RequestAdapter;

impl RequestAdapter {
    /// Parse and validate a single JSON request object
    pub fn parse_json(json: &str) -> Result<PredictRequest, PredictError> {
        let request: PredictRequest = serde_json::from_str(json)?;
        Self::validate(&request)?;
        Ok(request)
    }

    /// Parse and validate a request from an already-decoded JSON value
    pub fn parse_value(value: serde_json::Value) -> Result<PredictRequest, PredictError> {
        let request: PredictRequest = serde_json::from_value(value)?;
        Self::validate(&request)?;
        Ok(request)
    }

    /// Parse and validate a JSON array of requests
    pub fn parse_array(json: &str) -> Result<Vec<PredictRequest>, PredictError> {
        let requests: Vec<PredictRequest> = serde_json::from_str(json)?;
        for (index, request) in requests.iter().enumerate() {
            Self::validate(request).map_err(|e| {
                PredictError::InvalidInput(format!("request {}: {}", index, strip_prefix(&e)))
            })?;
        }
        Ok(requests)
    }

    /// Parse and validate newline-delimited JSON, one request per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<PredictRequest>, PredictError> {
        let mut requests = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match Self::parse_json(trimmed) {
                Ok(request) => requests.push(request),
                Err(e) => {
                    return Err(PredictError::InvalidInput(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        strip_prefix(&e)
                    )));
                }
            }
        }
        Ok(requests)
    }

    /// Reject values the JSON decoder cannot catch, such as NaN or infinities
    /// in requests constructed directly in Rust.
    pub fn validate(request: &PredictRequest) -> Result<(), PredictError> {
        for (name, value) in request.numeric_fields() {
            if !value.is_finite() {
                return Err(PredictError::InvalidInput(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn strip_prefix(e: &PredictError) -> String {
    match e {
        PredictError::InvalidInput(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "wearable_data": {
                "spo2": 98.0, "gsr_mean": 5.2, "gsr_phasic_std": 0.3,
                "ppg_rmssd": 45.0, "heart_rate": 70.0, "skin_temp": 33.0
            },
            "hormone_data": { "estrogen": 110.0, "progesterone": 2.0 },
            "day_in_cycle": 9
        }"#
    }

    #[test]
    fn test_parse_valid_request() {
        let request = RequestAdapter::parse_json(sample_json()).unwrap();
        assert_eq!(request.day_in_cycle, 9);
        assert_eq!(request.hormone_data.estrogen, 110.0);
    }

    #[test]
    fn test_missing_hormone_field() {
        let json = r#"{
            "wearable_data": {
                "spo2": 98.0, "gsr_mean": 5.2, "gsr_phasic_std": 0.3,
                "ppg_rmssd": 45.0, "heart_rate": 70.0, "skin_temp": 33.0
            },
            "hormone_data": { "progesterone": 2.0 },
            "day_in_cycle": 9
        }"#;

        let err = RequestAdapter::parse_json(json).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput(ref m) if m.contains("estrogen")));
    }

    #[test]
    fn test_non_numeric_field() {
        let json = sample_json().replace("\"gsr_mean\": 5.2", "\"gsr_mean\": \"high\"");
        let err = RequestAdapter::parse_json(&json).unwrap_err();
        assert!(err.is_client_fault());
    }

    #[test]
    fn test_missing_day_in_cycle() {
        let mut value: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
        value.as_object_mut().unwrap().remove("day_in_cycle");

        let err = RequestAdapter::parse_value(value).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput(ref m) if m.contains("day_in_cycle")));
    }

    #[test]
    fn test_fractional_day_is_rejected() {
        let json = sample_json().replace("\"day_in_cycle\": 9", "\"day_in_cycle\": 9.5");
        assert!(RequestAdapter::parse_json(&json).is_err());
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let json = sample_json().replace("\"day_in_cycle\": 9", "\"day_in_cycle\": 9, \"user_id\": 3");
        assert!(RequestAdapter::parse_json(&json).is_ok());
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let mut request = RequestAdapter::parse_json(sample_json()).unwrap();
        request.wearable_data.skin_temp = f64::INFINITY;

        let err = RequestAdapter::validate(&request).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput(ref m) if m.contains("skin_temp")));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let line = sample_json().replace('\n', " ");
        let ndjson = format!("{line}\n\n{{\"day_in_cycle\": 1}}\n");

        let err = RequestAdapter::parse_ndjson(&ndjson).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput(ref m) if m.contains("line 3")));

        let ok = RequestAdapter::parse_ndjson(&format!("{line}\n{line}\n")).unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn test_parse_array() {
        let json = format!("[{}, {}]", sample_json(), sample_json());
        let requests = RequestAdapter::parse_array(&json).unwrap();
        assert_eq!(requests.len(), 2);
    }
}
