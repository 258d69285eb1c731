//! Error types for Inner Weather

use thiserror::Error;

/// Errors that can occur while serving a single prediction
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model unavailable: no model has been loaded")]
    ModelUnavailable,

    #[error("Unmapped phase: {0}")]
    UnmappedPhase(String),
}

impl PredictError {
    /// Stable machine-readable code for the error
    pub fn code(&self) -> &'static str {
        match self {
            PredictError::InvalidInput(_) => "INVALID_INPUT",
            PredictError::ModelUnavailable => "MODEL_UNAVAILABLE",
            PredictError::UnmappedPhase(_) => "UNMAPPED_PHASE",
        }
    }

    /// Whether the caller can fix the request and retry
    pub fn is_client_fault(&self) -> bool {
        matches!(self, PredictError::InvalidInput(_))
    }
}

impl From<serde_json::Error> for PredictError {
    fn from(e: serde_json::Error) -> Self {
        PredictError::InvalidInput(e.to_string())
    }
}

/// Errors that can occur while loading a model artifact.
///
/// These are fatal at startup: a service that hits one never becomes ready.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model artifact JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model artifact is missing required key: {0}")]
    MissingKey(&'static str),

    #[error("Inconsistent model artifact: {0}")]
    Inconsistent(String),

    #[error("A model has already been loaded")]
    AlreadyLoaded,
}

impl ArtifactError {
    pub fn code(&self) -> &'static str {
        match self {
            ArtifactError::Io { .. } => "ARTIFACT_IO",
            ArtifactError::JsonError(_) => "ARTIFACT_JSON",
            ArtifactError::MissingKey(_) => "ARTIFACT_MISSING_KEY",
            ArtifactError::Inconsistent(_) => "ARTIFACT_INCONSISTENT",
            ArtifactError::AlreadyLoaded => "ARTIFACT_ALREADY_LOADED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let input = PredictError::InvalidInput("missing field `estrogen`".to_string());
        let unavailable = PredictError::ModelUnavailable;
        let unmapped = PredictError::UnmappedPhase("Unknown".to_string());

        assert!(input.is_client_fault());
        assert!(!unavailable.is_client_fault());
        assert!(!unmapped.is_client_fault());

        assert_eq!(input.code(), "INVALID_INPUT");
        assert_eq!(unavailable.code(), "MODEL_UNAVAILABLE");
        assert_eq!(unmapped.code(), "UNMAPPED_PHASE");
    }

    #[test]
    fn test_json_error_is_input_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PredictError = err.into();
        assert!(matches!(err, PredictError::InvalidInput(_)));
    }
}
