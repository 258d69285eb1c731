//! HTTP server exposing the prediction pipeline.
//!
//! Routes:
//! - `GET /health` - liveness and whether a model is installed
//! - `POST /predict` - run one prediction request
//! - `GET /model/info` - describe the loaded model
//!
//! # Architecture
//!
//! ```text
//! client ──→ POST /predict ──→ RequestAdapter ──→ PhasePredictor ──→ JSON response
//!                                                      ↑
//!                                       LoadedModel (installed once at startup)
//! ```

use crate::config::ServiceConfig;
use crate::error::PredictError;
use crate::pipeline::PhasePredictor;
use crate::schema::RequestAdapter;
use crate::types::{ModelInfo, PredictionResult};
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Shared server state
pub struct ServerState {
    predictor: Arc<PhasePredictor>,
}

impl ServerState {
    pub fn new(predictor: Arc<PhasePredictor>) -> Self {
        Self { predictor }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub version: String,
    pub instance_id: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: PredictError) -> ApiError {
    let status = match &e {
        PredictError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PredictError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        PredictError::UnmappedPhase(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(code = e.code(), "Prediction failed: {}", e);
    } else {
        tracing::debug!(code = e.code(), "Rejected request: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: e.code().to_string(),
        }),
    )
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.predictor.is_ready(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.predictor.instance_id().to_string(),
    })
}

/// POST /predict
///
/// The body is parsed by the request adapter rather than an extractor so that
/// every malformed payload, including invalid UTF-8, is reported as
/// `INVALID_INPUT`.
async fn predict(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let body = std::str::from_utf8(&body).map_err(|e| {
        api_error(PredictError::InvalidInput(format!(
            "request body is not valid UTF-8: {e}"
        )))
    })?;
    let request = RequestAdapter::parse_json(body).map_err(api_error)?;
    let result = state.predictor.predict(&request).map_err(api_error)?;
    Ok(Json(result))
}

/// GET /model/info
async fn model_info(State(state): State<Arc<ServerState>>) -> Result<Json<ModelInfo>, ApiError> {
    state.predictor.model_info().map(Json).map_err(api_error)
}

/// Build the application router around a predictor
pub fn router(predictor: Arc<PhasePredictor>) -> Router {
    let state = Arc::new(ServerState::new(predictor));

    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/model/info", get(model_info))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server with an existing predictor.
///
/// Returns the bound address and a sender that triggers graceful shutdown.
pub async fn run(
    addr: SocketAddr,
    predictor: Arc<PhasePredictor>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(predictor);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Inner Weather server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

/// Load the configured model, then start serving.
///
/// The model is loaded before the listener is bound, so a missing or corrupt
/// artifact stops startup and no request is ever accepted.
pub async fn start(
    config: &ServiceConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let mut model = crate::model::LoadedModel::from_path(&config.model_path)
        .with_context(|| format!("failed to load model {}", config.model_path.display()))?;
    if let Some(name) = &config.model_name {
        model = model.with_name(name.clone());
    }

    let predictor = Arc::new(PhasePredictor::with_model(model));
    run(config.bind_addr(), predictor).await
}
