//! AI suggestion routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;

use common::response::ApiResponse;

use crate::{
    error::ApiError,
    middleware::AuthUser,
    models::suggestion::{FeedbackRequest, SuggestionsQuery},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suggestions", get(get_suggestions))
        .route("/generate", post(generate_suggestions))
        .route("/feedback/:date", post(provide_feedback))
}

/// Suggestions for the requested day, generated on first access
pub async fn get_suggestions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion = state.suggestions.get_or_generate(user.id, &query).await?;

    Ok(Json(ApiResponse::data(json!({ "suggestion": suggestion }))))
}

/// Regenerate today's suggestions, replacing any stored ones
pub async fn generate_suggestions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion = state
        .suggestions
        .generate(user.id, Utc::now().date_naive())
        .await?;

    Ok(Json(ApiResponse::with_message(
        "Suggestions generated successfully",
        json!({ "suggestion": suggestion }),
    )))
}

/// Record the user's feedback on a day's suggestions
pub async fn provide_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion = state.suggestions.feedback(user.id, &date, &payload).await?;

    Ok(Json(ApiResponse::with_message(
        "Feedback recorded successfully",
        json!({ "suggestion": suggestion }),
    )))
}
