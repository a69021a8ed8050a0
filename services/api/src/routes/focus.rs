//! Focus session routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;

use common::response::ApiResponse;

use crate::{
    error::ApiError,
    middleware::AuthUser,
    models::focus::{AnalyticsQuery, EndSessionRequest, SessionListQuery, StartSessionRequest},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/end", post(end_session))
        .route("/active", get(get_active_session))
        .route("/analytics", get(get_analytics))
        .route("/sessions", get(get_sessions))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id", delete(delete_session))
}

/// Start a focus session for the authenticated user
pub async fn start_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.lifecycle.start(user.id, &payload).await?;

    Ok(Json(ApiResponse::with_message(
        "Focus session started",
        json!({ "session": session }),
    )))
}

/// End the active session and persist it
pub async fn end_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<EndSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, duration) = state.lifecycle.end(user.id, &payload).await?;

    Ok(Json(ApiResponse::with_message(
        "Focus session ended",
        json!({ "session": session, "duration": duration }),
    )))
}

/// Current active session, if any, with elapsed seconds
pub async fn get_active_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.lifecycle.active(user.id).await;

    Ok(Json(ApiResponse::data(json!({ "session": session }))))
}

/// Paginated session history with optional filters
pub async fn get_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SessionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (sessions, pagination) = state.lifecycle.list(user.id, &query).await?;

    Ok(Json(ApiResponse::data(json!({
        "sessions": sessions,
        "pagination": pagination,
    }))))
}

/// Fetch one session by id
pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.lifecycle.get(user.id, &id).await?;

    Ok(Json(ApiResponse::data(json!({ "session": session }))))
}

/// Delete one session by id
pub async fn delete_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.delete(user.id, &id).await?;

    Ok(Json(ApiResponse::<()>::message(
        "Session deleted successfully",
    )))
}

/// Time-windowed analytics for the authenticated user
pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.analytics.report(user.id, &query).await?;

    Ok(Json(ApiResponse::data(report)))
}
