//! The HTTP error boundary.
//!
//! Every failure below this point collapses into one of three response
//! shapes: `400 {error}`, `404 {error}`, `500 {error}`. Internal detail is
//! logged where the conversion happens and never serialized.

use crate::catalog::CatalogError;
use crate::ingest::IngestError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::NoFileProvided => ApiError::BadRequest(String::from("No file provided")),
            IngestError::PayloadTooLarge { limit } => ApiError::BadRequest(format!(
                "File too large. Maximum size is {} bytes",
                limit
            )),
            other => {
                error!(error = %other, "ingestion failed");
                ApiError::Internal
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => ApiError::NotFound(String::from("Video not found")),
            other => {
                error!(error = %other, "catalog operation failed");
                ApiError::Internal
            }
        }
    }
}
