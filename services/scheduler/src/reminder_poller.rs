//! Reminder delivery worker
//!
//! Every poll tick picks up reminders whose trigger time has passed, marks
//! them delivered, and schedules the next occurrence for enabled
//! recurrences. A second, daily job purges old non-recurring reminders.

use anyhow::Result;
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Recurrence document stored as JSONB on a reminder
///
/// Mirrors the shape the API service writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recurrence {
    pub enabled: bool,
    pub pattern: RecurrencePattern,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrencePattern {
    #[default]
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "custom")]
    Custom,
}

/// A due reminder as the worker sees it
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: Option<String>,
    pub remind_at: DateTime<Utc>,
    pub recurring: Recurrence,
}

/// Next trigger time after a delivered occurrence
///
/// Monthly steps clamp to the last day of shorter months. Custom patterns
/// have no computed next occurrence.
pub fn next_occurrence(
    from: DateTime<Utc>,
    pattern: RecurrencePattern,
) -> Option<DateTime<Utc>> {
    match pattern {
        RecurrencePattern::Daily => Some(from + Duration::days(1)),
        RecurrencePattern::Weekly => Some(from + Duration::days(7)),
        RecurrencePattern::Monthly => from.checked_add_months(Months::new(1)),
        RecurrencePattern::Custom => None,
    }
}

#[derive(Clone)]
pub struct ReminderPoller {
    pool: PgPool,
}

impl ReminderPoller {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch reminders whose trigger time has passed
    pub async fn due_reminders(&self) -> Result<Vec<DueReminder>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, message, remind_at, recurring
            FROM reminders
            WHERE remind_at <= NOW() AND delivered = FALSE AND active = TRUE
            ORDER BY remind_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_due_reminder).collect())
    }

    /// Process one poll tick, delivering every due reminder
    ///
    /// A failure on one reminder is logged and does not stop the rest of
    /// the batch.
    pub async fn run_once(&self) -> Result<usize> {
        let due = self.due_reminders().await?;
        if due.is_empty() {
            return Ok(0);
        }

        let mut delivered = 0;
        for reminder in due {
            match self.deliver(&reminder).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    error!("Failed to deliver reminder {}: {}", reminder.id, e);
                }
            }
        }

        info!("Delivered {} reminders", delivered);
        Ok(delivered)
    }

    async fn deliver(&self, reminder: &DueReminder) -> Result<()> {
        info!(
            "Delivering reminder {} to user {}: {}",
            reminder.id, reminder.user_id, reminder.title
        );

        sqlx::query(
            r#"
            UPDATE reminders
            SET delivered = TRUE, delivered_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(reminder.id)
        .execute(&self.pool)
        .await?;

        if reminder.recurring.enabled {
            self.schedule_next_occurrence(reminder).await?;
        }

        Ok(())
    }

    /// Insert the next instance of a recurring reminder
    async fn schedule_next_occurrence(&self, reminder: &DueReminder) -> Result<()> {
        let Some(next) = next_occurrence(reminder.remind_at, reminder.recurring.pattern) else {
            warn!(
                "Reminder {} uses a custom recurrence pattern, not re-scheduled",
                reminder.id
            );
            return Ok(());
        };

        if let Some(end_date) = reminder.recurring.end_date {
            if next > end_date {
                info!("Recurrence for reminder {} has ended", reminder.id);
                return Ok(());
            }
        }

        sqlx::query(
            r#"
            INSERT INTO reminders (user_id, title, message, remind_at, recurring)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reminder.user_id)
        .bind(&reminder.title)
        .bind(&reminder.message)
        .bind(next)
        .bind(Json(&reminder.recurring))
        .execute(&self.pool)
        .await?;

        info!(
            "Scheduled next occurrence of reminder {} at {}",
            reminder.id, next
        );
        Ok(())
    }

    /// Purge non-recurring reminders delivered more than 30 days ago
    pub async fn cleanup_old_reminders(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM reminders
            WHERE delivered = TRUE
              AND delivered_at < NOW() - INTERVAL '30 days'
              AND (recurring->>'enabled')::boolean = FALSE
            "#,
        )
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected();
        info!("Cleaned up {} old reminders", deleted);
        Ok(deleted)
    }

    /// Register the poll and cleanup cron jobs and start the scheduler
    pub async fn start(&self, poll_schedule: &str, cleanup_schedule: &str) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new().await?;

        let poller = self.clone();
        let poll_job = Job::new_async(poll_schedule, move |_, _| {
            let poller = poller.clone();
            Box::pin(async move {
                if let Err(e) = poller.run_once().await {
                    error!("Failed to process due reminders: {}", e);
                }
            })
        })?;
        scheduler.add(poll_job).await?;

        let poller = self.clone();
        let cleanup_job = Job::new_async(cleanup_schedule, move |_, _| {
            let poller = poller.clone();
            Box::pin(async move {
                if let Err(e) = poller.cleanup_old_reminders().await {
                    error!("Failed to clean up old reminders: {}", e);
                }
            })
        })?;
        scheduler.add(cleanup_job).await?;

        scheduler.start().await?;

        info!(
            "Started reminder scheduler with poll schedule: {}",
            poll_schedule
        );
        Ok(scheduler)
    }
}

fn map_due_reminder(row: &PgRow) -> DueReminder {
    let recurring: Json<Recurrence> = row.get("recurring");

    DueReminder {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        message: row.get("message"),
        remind_at: row.get("remind_at"),
        recurring: recurring.0,
    }
}
