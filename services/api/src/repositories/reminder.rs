//! Reminder repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::pagination::Page;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use crate::models::reminder::{Recurrence, Reminder};

/// Validated fields for a reminder insert
#[derive(Debug)]
pub struct NewReminder {
    pub title: String,
    pub message: Option<String>,
    pub remind_at: DateTime<Utc>,
    pub recurring: Recurrence,
}

/// Validated fields for a reminder update
#[derive(Debug, Default)]
pub struct ReminderChanges {
    pub title: Option<String>,
    pub message: Option<String>,
    pub remind_at: Option<DateTime<Utc>>,
    pub recurring: Option<Recurrence>,
    pub active: Option<bool>,
}

/// Filter applied to the reminder listing
#[derive(Debug, Default)]
pub struct ReminderFilter {
    pub active: Option<bool>,
    /// Restrict to future, undelivered reminders
    pub upcoming: bool,
}

/// Reminder repository for database operations
#[derive(Clone)]
pub struct ReminderRepository {
    pool: PgPool,
}

const REMINDER_COLUMNS: &str = "id, user_id, title, message, remind_at, recurring, delivered, \
     delivered_at, active, created_at, updated_at";

impl ReminderRepository {
    /// Create a new reminder repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a reminder for a user
    pub async fn create(&self, user_id: Uuid, reminder: &NewReminder) -> Result<Reminder> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO reminders (user_id, title, message, remind_at, recurring)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REMINDER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&reminder.title)
        .bind(&reminder.message)
        .bind(reminder.remind_at)
        .bind(Json(&reminder.recurring))
        .fetch_one(&self.pool)
        .await?;

        Ok(map_reminder(&row))
    }

    /// List a user's reminders soonest first
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &ReminderFilter,
        page: Page,
    ) -> Result<(Vec<Reminder>, i64)> {
        let where_clause = r#"
            WHERE user_id = $1
              AND ($2::bool IS NULL OR active = $2)
              AND (NOT $3 OR (remind_at >= NOW() AND delivered = FALSE))
        "#;

        let rows = sqlx::query(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders {where_clause} \
             ORDER BY remind_at ASC LIMIT $4 OFFSET $5"
        ))
        .bind(user_id)
        .bind(filter.active)
        .bind(filter.upcoming)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total_count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM reminders {where_clause}"))
                .bind(user_id)
                .bind(filter.active)
                .bind(filter.upcoming)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows.iter().map(map_reminder).collect(), total_count))
    }

    /// Apply a partial update, returning the new state when the reminder exists
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: &ReminderChanges,
    ) -> Result<Option<Reminder>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE reminders SET
                title = COALESCE($3, title),
                message = COALESCE($4, message),
                remind_at = COALESCE($5, remind_at),
                recurring = COALESCE($6, recurring),
                active = COALESCE($7, active),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {REMINDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&changes.title)
        .bind(&changes.message)
        .bind(changes.remind_at)
        .bind(changes.recurring.as_ref().map(Json))
        .bind(changes.active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_reminder(&row)))
    }

    /// Delete one reminder scoped to its owner
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_reminder(row: &PgRow) -> Reminder {
    let Json(recurring): Json<Recurrence> = row.get("recurring");

    Reminder {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        message: row.get("message"),
        remind_at: row.get("remind_at"),
        recurring,
        delivered: row.get("delivered"),
        delivered_at: row.get("delivered_at"),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
