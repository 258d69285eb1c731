//! Request and column schemas
//!
//! This module owns the two schema boundaries of the pipeline: the request
//! payload callers submit, and the ordered column layout the fitted model
//! expects.

mod columns;
mod request;

pub use columns::*;
pub use request::*;

/// Identifier of the request payload schema
pub const REQUEST_SCHEMA: &str = "inner_weather.predict_request.v1";

/// Identifier of the response payload schema
pub const RESPONSE_SCHEMA: &str = "inner_weather.prediction.v1";
