//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::documents::DocumentError;
use crate::face::FaceError;
use crate::push::PushError;

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
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                detail.clone(),
            ),
            ApiError::Unavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                detail.clone(),
            ),
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "Upstream service failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM",
                    "The push service could not be reached".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
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

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Invalid { .. } => ApiError::Validation(err.to_string()),
            DocumentError::UnknownKind(_) => ApiError::NotFound(err.to_string()),
            DocumentError::Malformed(_) => ApiError::BadRequest(err.to_string()),
            DocumentError::Pdf(_) | DocumentError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<PushError> for ApiError {
    fn from(err: PushError) -> Self {
        match err {
            PushError::InvalidEndpoint(_)
            | PushError::InvalidKeys(_)
            | PushError::InvalidRole
            | PushError::Payload(_) => ApiError::Validation(err.to_string()),
            PushError::Database(e) => e.into(),
            PushError::Http(_) | PushError::Endpoint { .. } => ApiError::Upstream(err.to_string()),
            PushError::Encryption(_) | PushError::Vapid(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<FaceError> for ApiError {
    fn from(err: FaceError) -> Self {
        match err {
            FaceError::LengthMismatch { .. }
            | FaceError::WrongLength { .. }
            | FaceError::NonFinite
            | FaceError::InvalidRegion(_)
            | FaceError::Decode(_) => ApiError::Validation(err.to_string()),
            FaceError::ModelNotFound(_) | FaceError::ModelInit(_) => {
                ApiError::Unavailable(err.to_string())
            }
            FaceError::Inference(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("subscription".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        // Internal errors hide details from client
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn document_validation_returns_422() {
        let err: ApiError = DocumentError::invalid("items", "at least one line item is required").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
        assert!(json["error"]["message"].as_str().unwrap().contains("items"));
    }

    #[test]
    fn unknown_document_kind_is_404() {
        let err: ApiError = DocumentError::UnknownKind("receipt".into()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn push_errors_map_by_cause() {
        let err: ApiError = PushError::InvalidRole.into();
        assert!(matches!(err, ApiError::Validation(_)));
        let err: ApiError = PushError::Http("refused".into()).into();
        assert!(matches!(err, ApiError::Upstream(_)));
        let err: ApiError = PushError::Vapid("bad key".into()).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn face_length_mismatch_is_validation() {
        let err: ApiError = FaceError::LengthMismatch { left: 128, right: 3 }.into();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
