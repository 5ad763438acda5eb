use axum::{body::Bytes, extract::State, Json};
use fd_types::FdError;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub scores: Vec<f64>,
}

/// Score one record or a batch of records.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<PredictResponse>> {
    let raw: Value = serde_json::from_slice(&body)
        .map_err(|e| FdError::Validation(format!("Request body is not valid JSON: {}", e)))?;
    let scores = state.scorer.score(&raw)?;
    Ok(Json(PredictResponse { scores }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    n_features: usize,
    timestamp: i64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        n_features: state.scorer.n_features(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
