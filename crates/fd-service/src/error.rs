//! Mapping of scoring failures to HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fd_types::{ErrorKind, FdError};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// Wrapper that renders an [`FdError`] as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub FdError);

impl From<FdError> for ApiError {
    fn from(err: FdError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match (&self.0, self.0.kind()) {
            (FdError::Validation(msg), _) => (StatusCode::BAD_REQUEST, msg.clone()),
            (err, ErrorKind::Model) => {
                tracing::error!("Model error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            (err, _) => {
                tracing::error!("Internal error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
