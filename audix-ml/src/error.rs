//! Error types for audix-ml HTTP handlers
//!
//! Every error renders as `{ "error": { "code", "message" } }`; pipeline failures also
//! carry their `stage`.

use crate::models::PipelineFailure;
use crate::types::SelectionError;
use crate::workflow::{BatchError, InputFormatError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload is not an acceptable recording (400)
    #[error(transparent)]
    InputFormat(#[from] InputFormatError),

    /// Unknown or empty component selection (400)
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Batch over the item cap (400)
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Pipeline run ended in a terminal failure (422)
    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),

    /// audix-common error
    #[error("Common error: {0}")]
    Common(#[from] audix_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let stage = match &self {
            ApiError::Pipeline(failure) => Some(failure.stage.as_str()),
            _ => None,
        };

        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InputFormat(_) => (StatusCode::BAD_REQUEST, "INPUT_FORMAT"),
            ApiError::Selection(_) => (StatusCode::BAD_REQUEST, "INVALID_COMPONENTS"),
            ApiError::Batch(BatchError::TooLarge { .. }) => (StatusCode::BAD_REQUEST, "BATCH_TOO_LARGE"),
            ApiError::Pipeline(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PIPELINE_FAILED"),
            ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
        };

        let message = match &self {
            ApiError::Pipeline(failure) => failure.reason.clone(),
            other => other.to_string(),
        };

        let body = match stage {
            Some(stage) => json!({
                "error": { "code": error_code, "message": message, "stage": stage }
            }),
            None => json!({
                "error": { "code": error_code, "message": message }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
