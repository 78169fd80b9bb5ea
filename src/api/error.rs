//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::import::UploadError;
use crate::pipeline::processor::ProcessingError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Report not generated")]
    ReportNotGenerated,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Upstream model error: {0}")]
    BadGateway(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::ReportNotGenerated => (
                StatusCode::NOT_FOUND,
                "REPORT_NOT_GENERATED",
                "Report not generated".to_string(),
            ),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "BILL_BUSY", detail.clone()),
            ApiError::PayloadTooLarge(detail) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                detail.clone(),
            ),
            ApiError::BadGateway(detail) => {
                tracing::error!(%detail, "Generative model call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "MODEL_UNAVAILABLE",
                    "The generative model request failed".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::MissingOwner => ApiError::BadRequest(err.to_string()),
            ProcessingError::Upload(UploadError::MissingFile | UploadError::EmptyFile) => {
                ApiError::BadRequest(err.to_string())
            }
            ProcessingError::Upload(UploadError::FileTooLarge { .. }) => {
                ApiError::PayloadTooLarge(err.to_string())
            }
            ProcessingError::BillNotFound(_) => ApiError::NotFound("Bill not found".into()),
            ProcessingError::BillBusy(_) => ApiError::Conflict(err.to_string()),
            ProcessingError::ReportNotGenerated(_) => ApiError::ReportNotGenerated,
            ProcessingError::Model(e) => ApiError::BadGateway(e.to_string()),
            ProcessingError::Upload(UploadError::Io(_))
            | ProcessingError::Report(_)
            | ProcessingError::Database(_) => ApiError::Internal(err.to_string()),
        }
    }
}
