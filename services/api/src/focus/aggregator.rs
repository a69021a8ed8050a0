//! Task-duration aggregator
//!
//! Keeps `tasks.actual_duration` equal to the rounded minute total of the
//! task's persisted work sessions. Runs after a work session is persisted
//! or deleted, always recomputing from scratch so repeated runs converge
//! on the same value.

use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::seconds_to_minutes;

#[derive(Clone)]
pub struct TaskDurationAggregator {
    pool: PgPool,
}

impl TaskDurationAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recompute and store the task's actual duration in minutes.
    ///
    /// Best-effort: failures are logged and swallowed so a broken recompute
    /// never fails the session operation that triggered it. A task that no
    /// longer exists is a no-op.
    pub async fn recompute(&self, task_id: Uuid) {
        if let Err(e) = self.try_recompute(task_id).await {
            warn!(
                "Failed to recompute actual duration for task {}: {}",
                task_id, e
            );
        }
    }

    async fn try_recompute(&self, task_id: Uuid) -> anyhow::Result<()> {
        let total_sec: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(duration_sec), 0)::bigint
            FROM focus_sessions
            WHERE task_id = $1 AND session_type = 'work'
            "#,
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;

        let minutes = seconds_to_minutes(total_sec) as i32;

        let result =
            sqlx::query("UPDATE tasks SET actual_duration = $2, updated_at = NOW() WHERE id = $1")
                .bind(task_id)
                .bind(minutes)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            debug!("Task {} no longer exists, skipped duration update", task_id);
        } else {
            debug!("Task {} actual duration set to {} minutes", task_id, minutes);
        }

        Ok(())
    }
}
