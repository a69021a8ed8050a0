//! Task repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::pagination::Page;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::task::{
    CategoryStat, PriorityStat, Task, TaskFilter, TaskStats, TaskStatsOverview,
};

/// Validated fields for a task insert
#[derive(Debug)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub estimated_duration: Option<i32>,
}

/// Validated fields for a task update; `due_date` uses the outer option
/// for "touch or not" and the inner for "set or clear"
#[derive(Debug, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i32>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
    pub archived: Option<bool>,
    pub estimated_duration: Option<i32>,
}

/// Fields a bulk update may set on every selected task
#[derive(Debug, Default)]
pub struct BulkChanges {
    pub category: Option<String>,
    pub priority: Option<i32>,
    pub completed: Option<bool>,
    pub archived: Option<bool>,
}

/// Task repository for database operations
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

const TASK_COLUMNS: &str = "id, user_id, title, description, category, priority, due_date, \
     tags, completed, completed_at, archived, estimated_duration, actual_duration, \
     created_at, updated_at";

impl TaskRepository {
    /// Create a new task repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a task for a user
    pub async fn create(&self, user_id: Uuid, task: &NewTask) -> Result<Task> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tasks
                (user_id, title, description, category, priority, due_date, tags, estimated_duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.category)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(&task.tags)
        .bind(task.estimated_duration)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_task(&row))
    }

    /// Fetch one task scoped to its owner
    pub async fn find_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_task(&row)))
    }

    /// Cheap ownership check used before attaching a task to a session
    pub async fn exists(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tasks WHERE id = $1 AND user_id = $2)")
                .bind(id)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// List tasks with filtering, sorting and pagination
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        page: Page,
    ) -> Result<(Vec<Task>, i64)> {
        let search = filter.search.as_deref().map(|s| format!("%{}%", escape_like(s)));
        let category = filter
            .category
            .as_deref()
            .map(|s| format!("%{}%", escape_like(s)));
        // The overdue shorthand forces completed = false
        let completed = if filter.overdue_only {
            Some(false)
        } else {
            filter.completed
        };

        let order = if filter.sort.descending { "DESC" } else { "ASC" };
        let where_clause = r#"
            WHERE user_id = $1
              AND archived = $2
              AND ($3::text IS NULL OR title ILIKE $3 OR description ILIKE $3)
              AND ($4::text IS NULL OR category ILIKE $4)
              AND ($5::bool IS NULL OR completed = $5)
              AND ($6::int[] IS NULL OR priority = ANY($6))
              AND ($7::timestamptz IS NULL OR due_date >= $7)
              AND ($8::timestamptz IS NULL OR due_date < $8)
              AND ($9::text[] IS NULL OR tags && $9)
        "#;

        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks {where_clause} \
             ORDER BY {column} {order} LIMIT $10 OFFSET $11",
            column = filter.sort.column,
        ))
        .bind(user_id)
        .bind(filter.archived)
        .bind(&search)
        .bind(&category)
        .bind(completed)
        .bind(&filter.priorities)
        .bind(filter.due_after)
        .bind(filter.due_before)
        .bind(&filter.tags)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total_count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tasks {where_clause}"))
                .bind(user_id)
                .bind(filter.archived)
                .bind(&search)
                .bind(&category)
                .bind(completed)
                .bind(&filter.priorities)
                .bind(filter.due_after)
                .bind(filter.due_before)
                .bind(&filter.tags)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows.iter().map(map_task).collect(), total_count))
    }

    /// Apply a partial update, returning the new state when the task exists
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: &TaskChanges,
    ) -> Result<Option<Task>> {
        let touch_due_date = changes.due_date.is_some();
        let due_date = changes.due_date.clone().flatten();

        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                priority = COALESCE($6, priority),
                due_date = CASE WHEN $7 THEN $8 ELSE due_date END,
                tags = COALESCE($9, tags),
                completed = COALESCE($10, completed),
                completed_at = CASE
                    WHEN $10 IS NULL THEN completed_at
                    WHEN $10 THEN COALESCE(completed_at, NOW())
                    ELSE NULL
                END,
                archived = COALESCE($11, archived),
                estimated_duration = COALESCE($12, estimated_duration),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.category)
        .bind(changes.priority)
        .bind(touch_due_date)
        .bind(due_date)
        .bind(&changes.tags)
        .bind(changes.completed)
        .bind(changes.archived)
        .bind(changes.estimated_duration)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_task(&row)))
    }

    /// Delete one task scoped to its owner
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip completion, stamping or clearing `completed_at`
    pub async fn toggle_complete(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks SET
                completed = NOT completed,
                completed_at = CASE WHEN NOT completed THEN NOW() ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_task(&row)))
    }

    /// Mark a task archived
    pub async fn archive(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks SET archived = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_task(&row)))
    }

    /// Apply the same changes to every owned task in `ids`, returning the
    /// number of rows touched
    pub async fn bulk_update(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        changes: &BulkChanges,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                category = COALESCE($3, category),
                priority = COALESCE($4, priority),
                completed = COALESCE($5, completed),
                completed_at = CASE
                    WHEN $5 IS NULL THEN completed_at
                    WHEN $5 THEN COALESCE(completed_at, NOW())
                    ELSE NULL
                END,
                archived = COALESCE($6, archived),
                updated_at = NOW()
            WHERE user_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .bind(&changes.category)
        .bind(changes.priority)
        .bind(changes.completed)
        .bind(changes.archived)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Aggregate counters plus category and priority breakdowns
    pub async fn stats(&self, user_id: Uuid) -> Result<TaskStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_tasks,
                   COUNT(*) FILTER (WHERE completed) AS completed_tasks,
                   COUNT(*) FILTER (WHERE NOT completed) AS pending_tasks,
                   COUNT(*) FILTER (WHERE archived) AS archived_tasks,
                   COUNT(*) FILTER (WHERE due_date < NOW() AND NOT completed) AS overdue_tasks
            FROM tasks
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let overview = TaskStatsOverview {
            total_tasks: row.get("total_tasks"),
            completed_tasks: row.get("completed_tasks"),
            pending_tasks: row.get("pending_tasks"),
            archived_tasks: row.get("archived_tasks"),
            overdue_tasks: row.get("overdue_tasks"),
        };

        let by_category = sqlx::query(
            r#"
            SELECT category,
                   COUNT(*) AS count,
                   COUNT(*) FILTER (WHERE completed) AS completed
            FROM tasks
            WHERE user_id = $1 AND archived = FALSE
            GROUP BY category
            ORDER BY count DESC
            LIMIT 10
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| CategoryStat {
            category: row.get("category"),
            count: row.get("count"),
            completed: row.get("completed"),
        })
        .collect();

        let by_priority = sqlx::query(
            r#"
            SELECT priority, COUNT(*) AS count
            FROM tasks
            WHERE user_id = $1 AND archived = FALSE AND completed = FALSE
            GROUP BY priority
            ORDER BY priority DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| PriorityStat {
            priority: row.get("priority"),
            count: row.get("count"),
        })
        .collect();

        Ok(TaskStats {
            overview,
            by_category,
            by_priority,
        })
    }

    /// Open tasks for the suggestion prompt, most urgent first
    pub async fn incomplete_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1 AND completed = FALSE AND archived = FALSE
            ORDER BY priority DESC, due_date ASC NULLS LAST
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_task).collect())
    }
}

fn map_task(row: &PgRow) -> Task {
    let due_date: Option<DateTime<Utc>> = row.get("due_date");
    let completed: bool = row.get("completed");
    let is_overdue = matches!(due_date, Some(due) if due < Utc::now() && !completed);

    Task {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        priority: row.get("priority"),
        due_date,
        tags: row.get("tags"),
        completed,
        completed_at: row.get("completed_at"),
        archived: row.get("archived"),
        estimated_duration: row.get("estimated_duration"),
        actual_duration: row.get("actual_duration"),
        is_overdue,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_done"), "50\\%\\_done");
        assert_eq!(escape_like("plain"), "plain");
    }
}
