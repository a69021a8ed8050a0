//! Task models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A task as returned by the API
///
/// `actual_duration` is derived from work focus sessions and never accepted
/// from the client. `is_overdue` is computed at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived: bool,
    /// Planned minutes
    pub estimated_duration: Option<i32>,
    /// Minutes accumulated from work sessions
    pub actual_duration: i32,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i32>,
    pub due_date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub estimated_duration: Option<i32>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i32>,
    /// Absent leaves the due date alone; an explicit `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
    pub archived: Option<bool>,
    pub estimated_duration: Option<i32>,
}

/// Keeps a present `null` distinct from an absent field: absent stays
/// `None`, anything present (null included) becomes `Some(...)`
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

/// Fields a bulk update may touch, applied to every selected task
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTaskUpdates {
    pub category: Option<String>,
    pub priority: Option<i32>,
    pub completed: Option<bool>,
    pub archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    pub task_ids: Option<Vec<String>>,
    #[serde(default)]
    pub updates: BulkTaskUpdates,
}

/// Query parameters for the task listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub completed: Option<String>,
    /// Comma-separated priority values, e.g. "4,5"
    pub priority: Option<String>,
    /// Shorthand filter: today | overdue | upcoming | this_week
    pub due_date: Option<String>,
    /// Comma-separated tag list
    pub tags: Option<String>,
    /// "field:order", e.g. "dueDate:asc"
    pub sort: Option<String>,
    pub archived: Option<String>,
}

/// Aggregate counters for the stats endpoint
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatsOverview {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub archived_tasks: i64,
    pub overdue_tasks: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: Option<String>,
    pub count: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityStat {
    pub priority: i32,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub overview: TaskStatsOverview,
    pub by_category: Vec<CategoryStat>,
    pub by_priority: Vec<PriorityStat>,
}

/// Normalized filter the repository applies to the task listing
#[derive(Debug, Default)]
pub struct TaskFilter {
    pub archived: bool,
    pub search: Option<String>,
    pub category: Option<String>,
    pub completed: Option<bool>,
    pub priorities: Option<Vec<i32>>,
    /// Inclusive lower bound on the due date
    pub due_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the due date
    pub due_before: Option<DateTime<Utc>>,
    /// Restrict to overdue open tasks regardless of `completed`
    pub overdue_only: bool,
    pub tags: Option<Vec<String>>,
    pub sort: TaskSort,
}

/// Whitelisted sort column plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub column: &'static str,
    pub descending: bool,
}

impl Default for TaskSort {
    fn default() -> Self {
        TaskSort {
            column: "created_at",
            descending: true,
        }
    }
}

impl TaskSort {
    /// Parse a "field:order" sort expression against the allowed fields
    pub fn parse(value: &str) -> Result<Self, crate::error::ApiError> {
        let invalid = || {
            crate::error::ApiError::Validation(
                "Sort must be in format field:order (e.g., createdAt:desc)".to_string(),
            )
        };

        let (field, order) = value.split_once(':').ok_or_else(invalid)?;
        let column = match field {
            "title" => "title",
            "createdAt" => "created_at",
            "updatedAt" => "updated_at",
            "dueDate" => "due_date",
            "priority" => "priority",
            _ => return Err(invalid()),
        };
        let descending = match order {
            "asc" => false,
            "desc" => true,
            _ => return Err(invalid()),
        };

        Ok(TaskSort { column, descending })
    }
}

impl TaskFilter {
    /// Build a filter from raw query parameters. `now` anchors the
    /// dueDate shorthand windows (UTC midnight boundaries).
    pub fn from_query(
        query: &TaskListQuery,
        now: DateTime<Utc>,
    ) -> Result<Self, crate::error::ApiError> {
        use crate::error::ApiError;

        let mut filter = TaskFilter {
            archived: query.archived.as_deref() == Some("true"),
            search: query.search.clone().filter(|s| !s.is_empty()),
            category: query.category.clone().filter(|s| !s.is_empty()),
            completed: query.completed.as_deref().map(|v| v == "true"),
            ..TaskFilter::default()
        };

        if let Some(priority) = query.priority.as_deref() {
            let mut priorities = Vec::new();
            for part in priority.split(',') {
                let value: i32 = part.trim().parse().map_err(|_| {
                    ApiError::Validation("Priority must be between 1 and 5".to_string())
                })?;
                if !(1..=5).contains(&value) {
                    return Err(ApiError::Validation(
                        "Priority must be between 1 and 5".to_string(),
                    ));
                }
                priorities.push(value);
            }
            if !priorities.is_empty() {
                filter.priorities = Some(priorities);
            }
        }

        if let Some(shorthand) = query.due_date.as_deref() {
            let today = now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or(now);
            let tomorrow = today + chrono::Duration::days(1);

            match shorthand {
                "today" => {
                    filter.due_after = Some(today);
                    filter.due_before = Some(tomorrow);
                }
                "overdue" => {
                    filter.due_before = Some(today);
                    filter.overdue_only = true;
                }
                "upcoming" => {
                    filter.due_after = Some(tomorrow);
                }
                "this_week" => {
                    filter.due_after = Some(today);
                    filter.due_before = Some(today + chrono::Duration::days(7));
                }
                _ => {
                    return Err(ApiError::Validation(
                        "Due date filter must be today, overdue, upcoming, or this_week"
                            .to_string(),
                    ));
                }
            }
        }

        if let Some(tags) = query.tags.as_deref() {
            let list: Vec<String> = tags
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !list.is_empty() {
                filter.tags = Some(list);
            }
        }

        if let Some(sort) = query.sort.as_deref() {
            filter.sort = TaskSort::parse(sort)?;
        }

        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_serializes_camel_case() {
        let task = Task {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "Write report".to_string(),
            description: None,
            category: Some("writing".to_string()),
            priority: 3,
            due_date: None,
            tags: vec![],
            completed: false,
            completed_at: None,
            archived: false,
            estimated_duration: Some(60),
            actual_duration: 0,
            is_overdue: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("dueDate").is_some());
        assert!(value.get("actualDuration").is_some());
        assert!(value.get("isOverdue").is_some());
    }

    #[test]
    fn test_bulk_request_tolerates_missing_updates() {
        let req: BulkUpdateRequest = serde_json::from_str(r#"{"taskIds": []}"#).unwrap();
        assert!(req.updates.completed.is_none());
        assert_eq!(req.task_ids.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_update_request_distinguishes_null_due_date() {
        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let untouched: UpdateTaskRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(untouched.due_date, None);

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueDate": "2025-06-01T00:00:00Z"}"#).unwrap();
        assert_eq!(set.due_date, Some(Some("2025-06-01T00:00:00Z".to_string())));
    }

    #[test]
    fn test_sort_whitelist() {
        let sort = TaskSort::parse("dueDate:asc").unwrap();
        assert_eq!(sort.column, "due_date");
        assert!(!sort.descending);

        assert!(TaskSort::parse("password:asc").is_err());
        assert!(TaskSort::parse("title").is_err());
        assert!(TaskSort::parse("title:sideways").is_err());
    }

    #[test]
    fn test_filter_due_date_shorthands() {
        let now = DateTime::parse_from_rfc3339("2025-06-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let query = TaskListQuery {
            due_date: Some("today".to_string()),
            ..TaskListQuery::default()
        };
        let filter = TaskFilter::from_query(&query, now).unwrap();
        assert_eq!(
            filter.due_after.unwrap().to_rfc3339(),
            "2025-06-15T00:00:00+00:00"
        );
        assert_eq!(
            filter.due_before.unwrap().to_rfc3339(),
            "2025-06-16T00:00:00+00:00"
        );
        assert!(!filter.overdue_only);

        let query = TaskListQuery {
            due_date: Some("overdue".to_string()),
            ..TaskListQuery::default()
        };
        let filter = TaskFilter::from_query(&query, now).unwrap();
        assert!(filter.overdue_only);
        assert!(filter.due_after.is_none());

        let query = TaskListQuery {
            due_date: Some("someday".to_string()),
            ..TaskListQuery::default()
        };
        assert!(TaskFilter::from_query(&query, now).is_err());
    }

    #[test]
    fn test_filter_parses_priorities_and_tags() {
        let query = TaskListQuery {
            priority: Some("4,5".to_string()),
            tags: Some("deep-work, writing".to_string()),
            ..TaskListQuery::default()
        };
        let filter = TaskFilter::from_query(&query, Utc::now()).unwrap();
        assert_eq!(filter.priorities, Some(vec![4, 5]));
        assert_eq!(
            filter.tags,
            Some(vec!["deep-work".to_string(), "writing".to_string()])
        );

        let query = TaskListQuery {
            priority: Some("6".to_string()),
            ..TaskListQuery::default()
        };
        assert!(TaskFilter::from_query(&query, Utc::now()).is_err());
    }
}
