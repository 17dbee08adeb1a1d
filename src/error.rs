//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::logic::features::{MissingNames, ResolveError};
use crate::logic::model::InferenceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Client input errors
    BadRequest(String),
    MissingFeatures(String, MissingNames),

    // Request shape errors (body not matching the request schema)
    Unprocessable(String),

    // Resource errors
    NotFound(String),

    // Batch upload failures, message surfaced to the caller
    BatchProcessing(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFeatures(msg, _) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BatchProcessing(msg) => {
                tracing::error!("Batch processing error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Error processing CSV: {}", msg))
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = match &self {
            AppError::MissingFeatures(_, missing) => json!({
                "detail": detail,
                "missing": missing.shown,
                "total_missing": missing.total,
                "status": status.as_u16()
            }),
            _ => json!({
                "detail": detail,
                "status": status.as_u16()
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::MissingFeatures(ref missing) | ResolveError::MissingColumns(ref missing) => {
                AppError::MissingFeatures(err.to_string(), missing.clone())
            }
            ResolveError::InvalidValue(_) => AppError::Unprocessable(err.to_string()),
            ResolveError::KeyNotFound(_) => AppError::NotFound(err.to_string()),
            ResolveError::Table(e) => AppError::InternalError(e.to_string()),
        }
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unprocessable("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BatchProcessing("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_key_not_found_maps_to_404() {
        let err: AppError = ResolveError::KeyNotFound(7).into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "kepid not found"));
    }

    #[test]
    fn test_invalid_value_maps_to_422() {
        let err: AppError = ResolveError::InvalidValue("koi_depth".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
