//! # fd-service
//!
//! HTTP front end for the FraudDetect scorer. The model is loaded once by the
//! caller and shared read-only across requests.

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use fd_engine::Scorer;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<Scorer>,
}

impl AppState {
    pub fn new(scorer: Scorer) -> Self {
        Self {
            scorer: Arc::new(scorer),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
