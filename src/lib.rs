//! Inner Weather - Menstrual phase and mood inference from wearable data
//!
//! Inner Weather turns one day of wearable and hormone measurements into a
//! predicted cycle phase through a deterministic pipeline: feature derivation
//! → column alignment → model inference → mood mapping → result composition.
//!
//! The fitted model is an explicit value ([`LoadedModel`]) that callers load
//! once and pass in, or hand to a [`PhasePredictor`] shared across threads.
//!
//! ## Modules
//!
//! - **Pipeline**: [`predict_phase`] and [`PhasePredictor`]
//! - **Model**: artifact loading and fitted estimator steps
//! - **Server** (feature `server`): HTTP surface over the pipeline

pub mod composer;
pub mod config;
pub mod error;
pub mod features;
pub mod inference;
pub mod model;
pub mod mood;
pub mod pipeline;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ServiceConfig;
pub use error::{ArtifactError, PredictError};
pub use features::{FeatureDeriver, FeatureVector};
pub use model::{LoadedModel, ModelSlot};
pub use mood::{mood_for_label, Mood, Phase};
pub use pipeline::{predict_json, predict_phase, PhasePredictor};
pub use types::{HormoneData, ModelInfo, PredictRequest, PredictionResult, WearableData};

/// Crate version reported by the server and CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
