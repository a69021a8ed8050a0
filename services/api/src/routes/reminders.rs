//! Reminder routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;

use common::{
    pagination::{Page, PageParams, Pagination},
    response::ApiResponse,
};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::reminder::{CreateReminderRequest, ReminderListQuery, UpdateReminderRequest},
    repositories::reminder::{NewReminder, ReminderChanges, ReminderFilter},
    state::AppState,
    validation::{optional_length, parse_datetime, parse_id, require_length},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_reminders))
        .route("/", post(create_reminder))
        .route("/:id", put(update_reminder))
        .route("/:id", delete(delete_reminder))
}

/// Paginated reminders sorted by trigger time, active ones by default
pub async fn get_reminders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReminderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ReminderFilter {
        active: Some(query.active.as_deref().map_or(true, |v| v == "true")),
        upcoming: query.upcoming.as_deref() == Some("true"),
    };
    let page = Page::from_params(&PageParams {
        page: query.page,
        limit: query.limit,
    });

    let (reminders, total_count) = state
        .reminder_repository
        .list(user.id, &filter, page)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reminders: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(ApiResponse::data(json!({
        "reminders": reminders,
        "pagination": Pagination::new(page, total_count),
    }))))
}

/// Create a reminder for the authenticated user
pub async fn create_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateReminderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_reminder = validate_create(&payload)?;

    let reminder = state
        .reminder_repository
        .create(user.id, &new_reminder)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create reminder: {}", e);
            ApiError::InternalServerError
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Reminder created successfully",
            json!({ "reminder": reminder }),
        )),
    ))
}

/// Apply a partial update to one reminder
pub async fn update_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateReminderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid reminder ID")?;
    let changes = validate_update(&payload)?;

    let reminder = state
        .reminder_repository
        .update(id, user.id, &changes)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update reminder: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Reminder not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Reminder updated successfully",
        json!({ "reminder": reminder }),
    )))
}

/// Delete one reminder
pub async fn delete_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid reminder ID")?;

    let deleted = state
        .reminder_repository
        .delete(id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete reminder: {}", e);
            ApiError::InternalServerError
        })?;

    if !deleted {
        return Err(ApiError::NotFound("Reminder not found".to_string()));
    }

    Ok(Json(ApiResponse::<()>::message(
        "Reminder deleted successfully",
    )))
}

fn validate_create(payload: &CreateReminderRequest) -> ApiResult<NewReminder> {
    let title = require_length(
        &payload.title,
        1,
        200,
        "Title must be between 1 and 200 characters",
    )?;
    let message = optional_length(
        payload.message.clone(),
        500,
        "Message cannot exceed 500 characters",
    )?;

    let remind_at = match payload.when.as_deref() {
        Some(value) => parse_datetime(value, "When must be a valid ISO8601 date")?,
        None => {
            return Err(ApiError::Validation(
                "When must be a valid ISO8601 date".to_string(),
            ));
        }
    };

    Ok(NewReminder {
        title,
        message,
        remind_at,
        recurring: payload.recurring.clone().unwrap_or_default(),
    })
}

fn validate_update(payload: &UpdateReminderRequest) -> ApiResult<ReminderChanges> {
    let title = match payload.title.as_deref() {
        Some(value) => Some(require_length(
            value,
            1,
            200,
            "Title must be between 1 and 200 characters",
        )?),
        None => None,
    };
    let message = optional_length(
        payload.message.clone(),
        500,
        "Message cannot exceed 500 characters",
    )?;
    let remind_at = match payload.when.as_deref() {
        Some(value) => Some(parse_datetime(value, "When must be a valid ISO8601 date")?),
        None => None,
    };

    Ok(ReminderChanges {
        title,
        message,
        remind_at,
        recurring: payload.recurring.clone(),
        active: payload.active,
    })
}
