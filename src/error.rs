use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SketchError {
    #[error("Invalid image file: {0}")]
    InvalidImage(String),

    #[error("Unknown filter type: {0}")]
    InvalidFilterType(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Object storage is not configured")]
    StorageNotConfigured,

    #[error("Storage request failed: {0}")]
    StorageError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl SketchError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            SketchError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
            SketchError::InvalidFilterType(_) => (StatusCode::BAD_REQUEST, "INVALID_FILTER_TYPE"),
            SketchError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMETER"),
            SketchError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            SketchError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            SketchError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            SketchError::StorageNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_NOT_CONFIGURED")
            }
            SketchError::StorageError(_) => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR"),
            SketchError::ProcessingError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR")
            }
            SketchError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for SketchError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
