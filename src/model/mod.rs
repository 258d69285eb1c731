//! The fitted model and its lifecycle
//!
//! A model is loaded once, before any request is served, and is read-only
//! afterwards. [`ModelSlot`] holds it and makes the window before loading
//! completes observable as [`PredictError::ModelUnavailable`].

mod artifact;
pub mod estimator;

pub use artifact::{LoadedModel, DEFAULT_MODEL_NAME};
pub use estimator::{Classifier, DecisionTree, EstimatorError, Pipeline, Transform};

use crate::error::{ArtifactError, PredictError};
use std::sync::OnceLock;

/// Write-once holder for the loaded model
#[derive(Debug, Default)]
pub struct ModelSlot {
    model: OnceLock<LoadedModel>,
}

impl ModelSlot {
    /// A slot with no model; predictions fail until [`ModelSlot::install`] runs
    pub fn empty() -> Self {
        Self::default()
    }

    /// A slot that already holds `model`
    pub fn loaded(model: LoadedModel) -> Self {
        let slot = Self::empty();
        // A fresh slot cannot already be set
        let _ = slot.model.set(model);
        slot
    }

    /// Install the model. Only the first call succeeds.
    pub fn install(&self, model: LoadedModel) -> Result<(), ArtifactError> {
        self.model
            .set(model)
            .map_err(|_| ArtifactError::AlreadyLoaded)
    }

    pub fn get(&self) -> Result<&LoadedModel, PredictError> {
        self.model.get().ok_or(PredictError::ModelUnavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::uniform_model;

    #[test]
    fn test_empty_slot_is_unavailable() {
        let slot = ModelSlot::empty();
        assert!(!slot.is_loaded());
        assert!(matches!(slot.get(), Err(PredictError::ModelUnavailable)));
    }

    #[test]
    fn test_install_once() {
        let slot = ModelSlot::empty();
        slot.install(uniform_model()).unwrap();
        assert!(slot.is_loaded());
        assert!(slot.get().is_ok());

        let second = slot.install(uniform_model());
        assert!(matches!(second, Err(ArtifactError::AlreadyLoaded)));
    }

    #[test]
    fn test_loaded_slot() {
        let slot = ModelSlot::loaded(uniform_model());
        assert_eq!(slot.get().unwrap().label_classes().len(), 4);
    }
}
