use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::client::{ClientError, HttpError};
use crate::ingest::IngestError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A non-2xx answer from the admin API, relayed with its status.
    #[error(transparent)]
    Upstream(HttpError),

    #[error("Upstream unavailable: {0}")]
    BadGateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ClientError> for AppError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(e) if e.status == 404 => AppError::NotFound(e.message()),
            ClientError::Http(e) => AppError::Upstream(e),
            ClientError::AuthRequired(msg) => AppError::Unauthorized(msg),
            ClientError::Network(msg) | ClientError::Decode(msg) => AppError::BadGateway(msg),
            ClientError::InvalidRequest(msg) => AppError::Validation(msg),
            ClientError::Aborted(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("Resume {id} not found")),
            StoreError::Backend(msg) => AppError::Storage(msg),
            StoreError::Client(e) => e.into(),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::InvalidInput(msg) => AppError::Validation(msg),
            IngestError::ExtractionFormat(msg) => AppError::UnprocessableEntity(msg),
            IngestError::Extractor(msg) => AppError::BadGateway(msg),
            IngestError::Store(e) => e.into(),
            IngestError::Storage(msg) => AppError::Storage(msg),
            IngestError::Aborted(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Upstream(e) => {
                tracing::warn!("Upstream error: {e} {}", e.body);
                (
                    StatusCode::from_u16(e.status).unwrap_or(StatusCode::BAD_GATEWAY),
                    "UPSTREAM_ERROR",
                    e.message(),
                )
            }
            AppError::BadGateway(msg) => {
                tracing::error!("Upstream unavailable: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "An upstream service could not be reached".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
