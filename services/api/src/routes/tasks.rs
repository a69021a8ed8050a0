//! Task routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use common::{
    pagination::{Page, PageParams, Pagination},
    response::ApiResponse,
};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::task::{
        BulkUpdateRequest, CreateTaskRequest, TaskFilter, TaskListQuery, UpdateTaskRequest,
    },
    repositories::task::{BulkChanges, NewTask, TaskChanges},
    state::AppState,
    validation::{optional_length, parse_datetime, parse_id, require_int_range, require_length},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_tasks))
        .route("/", post(create_task))
        .route("/stats", get(get_task_stats))
        .route("/bulk-update", post(bulk_update_tasks))
        .route("/:id", get(get_task))
        .route("/:id", put(update_task))
        .route("/:id", delete(delete_task))
        .route("/:id/toggle", post(toggle_complete))
        .route("/:id/archive", post(archive_task))
}

/// Filtered, sorted, paginated task listing
pub async fn get_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = TaskFilter::from_query(&query, Utc::now())?;
    let page = Page::from_params(&PageParams {
        page: query.page,
        limit: query.limit,
    });

    let (tasks, total_count) = state
        .task_repository
        .list(user.id, &filter, page)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list tasks: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(ApiResponse::data(json!({
        "tasks": tasks,
        "pagination": Pagination::new(page, total_count),
    }))))
}

/// Aggregate task counters plus category and priority breakdowns
pub async fn get_task_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.task_repository.stats(user.id).await.map_err(|e| {
        tracing::error!("Failed to compute task stats: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(ApiResponse::data(stats)))
}

/// Fetch one task by id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid task ID")?;

    let task = state
        .task_repository
        .find_by_id(id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch task: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(ApiResponse::data(json!({ "task": task }))))
}

/// Create a task for the authenticated user
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_task = validate_create(&payload)?;

    let task = state
        .task_repository
        .create(user.id, &new_task)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create task: {}", e);
            ApiError::InternalServerError
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Task created successfully",
            json!({ "task": task }),
        )),
    ))
}

/// Apply a partial update to one task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid task ID")?;
    let changes = validate_update(&payload)?;

    let task = state
        .task_repository
        .update(id, user.id, &changes)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update task: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Task updated successfully",
        json!({ "task": task }),
    )))
}

/// Delete one task; its focus history survives with the task reference cleared
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid task ID")?;

    let deleted = state
        .task_repository
        .delete(id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete task: {}", e);
            ApiError::InternalServerError
        })?;

    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    Ok(Json(ApiResponse::<()>::message("Task deleted successfully")))
}

/// Flip the completed flag
pub async fn toggle_complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid task ID")?;

    let task = state
        .task_repository
        .toggle_complete(id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to toggle task: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let message = format!(
        "Task marked as {}",
        if task.completed { "completed" } else { "incomplete" }
    );

    Ok(Json(ApiResponse::with_message(message, json!({ "task": task }))))
}

/// Move one task into the archive
pub async fn archive_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid task ID")?;

    let task = state
        .task_repository
        .archive(id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to archive task: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Task archived successfully",
        json!({ "task": task }),
    )))
}

/// Apply the same whitelisted changes to a set of tasks
pub async fn bulk_update_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<BulkUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = parse_task_ids(&payload.task_ids)?;

    if let Some(priority) = payload.updates.priority {
        require_int_range(i64::from(priority), 1, 5, "Priority must be between 1 and 5")?;
    }
    let category = optional_length(
        payload.updates.category.clone(),
        50,
        "Category cannot exceed 50 characters",
    )?;

    let changes = BulkChanges {
        category,
        priority: payload.updates.priority,
        completed: payload.updates.completed,
        archived: payload.updates.archived,
    };

    let modified = state
        .task_repository
        .bulk_update(user.id, &ids, &changes)
        .await
        .map_err(|e| {
            tracing::error!("Failed to bulk update tasks: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(ApiResponse::with_message(
        format!("{} tasks updated successfully", modified),
        json!({ "matchedCount": modified, "modifiedCount": modified }),
    )))
}

fn parse_task_ids(ids: &Option<Vec<String>>) -> ApiResult<Vec<Uuid>> {
    let ids = ids.as_deref().unwrap_or_default();
    if ids.is_empty() {
        return Err(ApiError::Validation("Task IDs array is required".to_string()));
    }

    ids.iter()
        .map(|id| Uuid::parse_str(id))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::Validation("Invalid task IDs found".to_string()))
}

fn validate_create(payload: &CreateTaskRequest) -> ApiResult<NewTask> {
    let title = require_length(
        &payload.title,
        1,
        200,
        "Title must be between 1 and 200 characters",
    )?;
    let description = optional_length(
        payload.description.clone(),
        1000,
        "Description cannot exceed 1000 characters",
    )?;
    let category = optional_length(
        payload.category.clone(),
        50,
        "Category cannot exceed 50 characters",
    )?;

    let priority = payload.priority.unwrap_or(3);
    require_int_range(i64::from(priority), 1, 5, "Priority must be between 1 and 5")?;

    let due_date = match payload.due_date.as_deref() {
        Some(value) => Some(parse_datetime(value, "Due date must be a valid ISO8601 date")?),
        None => None,
    };

    let tags = validate_tags(payload.tags.clone())?.unwrap_or_default();
    validate_estimated_duration(payload.estimated_duration)?;

    Ok(NewTask {
        title,
        description,
        category,
        priority,
        due_date,
        tags,
        estimated_duration: payload.estimated_duration,
    })
}

fn validate_update(payload: &UpdateTaskRequest) -> ApiResult<TaskChanges> {
    let title = match payload.title.as_deref() {
        Some(value) => Some(require_length(
            value,
            1,
            200,
            "Title must be between 1 and 200 characters",
        )?),
        None => None,
    };
    let description = optional_length(
        payload.description.clone(),
        1000,
        "Description cannot exceed 1000 characters",
    )?;
    let category = optional_length(
        payload.category.clone(),
        50,
        "Category cannot exceed 50 characters",
    )?;

    if let Some(priority) = payload.priority {
        require_int_range(i64::from(priority), 1, 5, "Priority must be between 1 and 5")?;
    }

    let due_date = match &payload.due_date {
        Some(Some(value)) => Some(Some(parse_datetime(
            value,
            "Due date must be a valid ISO8601 date",
        )?)),
        Some(None) => Some(None),
        None => None,
    };

    let tags = validate_tags(payload.tags.clone())?;
    validate_estimated_duration(payload.estimated_duration)?;

    Ok(TaskChanges {
        title,
        description,
        category,
        priority: payload.priority,
        due_date,
        tags,
        completed: payload.completed,
        archived: payload.archived,
        estimated_duration: payload.estimated_duration,
    })
}

fn validate_tags(tags: Option<Vec<String>>) -> ApiResult<Option<Vec<String>>> {
    let Some(tags) = tags else { return Ok(None) };

    let mut cleaned = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if tag.chars().count() > 30 {
            return Err(ApiError::Validation(
                "Each tag cannot exceed 30 characters".to_string(),
            ));
        }
        if !tag.is_empty() {
            cleaned.push(tag);
        }
    }
    Ok(Some(cleaned))
}

fn validate_estimated_duration(minutes: Option<i32>) -> ApiResult<()> {
    if let Some(minutes) = minutes {
        if minutes < 0 {
            return Err(ApiError::Validation(
                "Estimated duration must be a non-negative integer".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_create_trims_and_defaults() {
        let payload = CreateTaskRequest {
            title: "  Ship the release  ".to_string(),
            description: None,
            category: None,
            priority: None,
            due_date: None,
            tags: Some(vec![" rust ".to_string(), "".to_string()]),
            estimated_duration: None,
        };

        let task = validate_create(&payload).unwrap();

        assert_eq!(task.title, "Ship the release");
        assert_eq!(task.priority, 3);
        assert_eq!(task.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn test_validate_create_rejects_bad_priority() {
        let payload = CreateTaskRequest {
            title: "x".to_string(),
            priority: Some(6),
            ..Default::default()
        };

        let err = validate_create(&payload).unwrap_err();
        assert_eq!(err.to_string(), "Priority must be between 1 and 5");
    }

    #[test]
    fn test_validate_update_distinguishes_clear_from_absent() {
        let absent = UpdateTaskRequest::default();
        assert!(validate_update(&absent).unwrap().due_date.is_none());

        let cleared: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(validate_update(&cleared).unwrap().due_date, Some(None));

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueDate": "2025-07-01"}"#).unwrap();
        assert!(matches!(
            validate_update(&set).unwrap().due_date,
            Some(Some(_))
        ));
    }

    #[test]
    fn test_validate_tags_rejects_long_tags() {
        let err = validate_tags(Some(vec!["t".repeat(31)])).unwrap_err();
        assert_eq!(err.to_string(), "Each tag cannot exceed 30 characters");
    }

    #[test]
    fn test_parse_task_ids_requires_a_non_empty_array() {
        assert_eq!(
            parse_task_ids(&None).unwrap_err().to_string(),
            "Task IDs array is required"
        );
        assert_eq!(
            parse_task_ids(&Some(vec![])).unwrap_err().to_string(),
            "Task IDs array is required"
        );
        assert_eq!(
            parse_task_ids(&Some(vec!["nope".to_string()]))
                .unwrap_err()
                .to_string(),
            "Invalid task IDs found"
        );

        let ids = parse_task_ids(&Some(vec![Uuid::nil().to_string()])).unwrap();
        assert_eq!(ids, vec![Uuid::nil()]);
    }
}
