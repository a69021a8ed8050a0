//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::focus::ActiveSession;

/// Custom error type for the API service
///
/// Every failure is translated into a `{success: false, message}` body at
/// the response boundary; internal detail stays in the logs.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed or out-of-range input, rejected before any state change
    #[error("Validation error: {0}")]
    Validation(String),

    /// Starting a session while one is already active. Carries the live
    /// session so the client can reconcile.
    #[error("{message}")]
    Conflict {
        message: String,
        active_session: ActiveSession,
    },

    /// Missing resource, or a resource owned by another user
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream dependency is missing configuration or unreachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"success": false, "message": "Unauthorized"}),
            ),
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                json!({"success": false, "message": message}),
            ),
            ApiError::Conflict {
                message,
                active_session,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "success": false,
                    "message": message,
                    "activeSession": active_session,
                }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({"success": false, "message": message}),
            ),
            ApiError::ServiceUnavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"success": false, "message": message}),
            ),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"success": false, "message": "Internal server error"}),
            ),
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"success": false, "message": "Database error"}),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::focus::SessionType;
    use chrono::Utc;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_shape() {
        let response = ApiError::Validation("Invalid session ID".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid session ID");
    }

    #[tokio::test]
    async fn test_conflict_attaches_active_session() {
        let session = ActiveSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            task_id: None,
            session_type: SessionType::Work,
            start_at: Utc::now(),
            estimated_duration: None,
        };

        let response = ApiError::Conflict {
            message: "You already have an active session. Please end it first.".to_string(),
            active_session: session.clone(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["activeSession"]["id"],
            serde_json::json!(session.id.to_string())
        );
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let response = ApiError::Database(common::error::DatabaseError::Migration(
            "secret detail".to_string(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Database error");
    }
}
