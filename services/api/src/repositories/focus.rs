//! Focus session repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::pagination::Page;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::focus::{FocusSession, SessionType, SessionWithTask, TaskRef};

/// Fields for a session record about to be persisted
#[derive(Debug)]
pub struct NewFocusSession {
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_sec: i64,
    pub interrupted: bool,
    pub session_type: SessionType,
    pub notes: Option<String>,
}

/// Filter applied to the session history listing
#[derive(Debug, Default)]
pub struct SessionFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub task_id: Option<Uuid>,
    pub session_type: Option<SessionType>,
}

/// Focus session repository for database operations
#[derive(Clone)]
pub struct FocusRepository {
    pool: PgPool,
}

const SESSION_COLUMNS: &str = "fs.id, fs.user_id, fs.task_id, fs.start_at, fs.end_at, \
     fs.duration_sec, fs.interrupted, fs.session_type, fs.notes, fs.created_at, fs.updated_at";

impl FocusRepository {
    /// Create a new focus session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist an ended session
    pub async fn insert(&self, record: &NewFocusSession) -> Result<FocusSession> {
        let row = sqlx::query(
            r#"
            INSERT INTO focus_sessions
                (user_id, task_id, start_at, end_at, duration_sec, interrupted, session_type, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, task_id, start_at, end_at, duration_sec, interrupted,
                      session_type, notes, created_at, updated_at
            "#,
        )
        .bind(record.user_id)
        .bind(record.task_id)
        .bind(record.start_at)
        .bind(record.end_at)
        .bind(record.duration_sec)
        .bind(record.interrupted)
        .bind(record.session_type.as_str())
        .bind(&record.notes)
        .fetch_one(&self.pool)
        .await?;

        map_session(&row)
    }

    /// List a user's sessions with their task references, newest first
    pub async fn find_with_task(
        &self,
        user_id: Uuid,
        filter: &SessionFilter,
        page: Page,
    ) -> Result<(Vec<SessionWithTask>, i64)> {
        let session_type = filter.session_type.map(|t| t.as_str());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SESSION_COLUMNS}, t.title AS task_title, t.category AS task_category
            FROM focus_sessions fs
            LEFT JOIN tasks t ON t.id = fs.task_id
            WHERE fs.user_id = $1
              AND ($2::timestamptz IS NULL OR fs.start_at >= $2)
              AND ($3::timestamptz IS NULL OR fs.start_at <= $3)
              AND ($4::uuid IS NULL OR fs.task_id = $4)
              AND ($5::text IS NULL OR fs.session_type = $5)
            ORDER BY fs.start_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(user_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.task_id)
        .bind(session_type)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM focus_sessions fs
            WHERE fs.user_id = $1
              AND ($2::timestamptz IS NULL OR fs.start_at >= $2)
              AND ($3::timestamptz IS NULL OR fs.start_at <= $3)
              AND ($4::uuid IS NULL OR fs.task_id = $4)
              AND ($5::text IS NULL OR fs.session_type = $5)
            "#,
        )
        .bind(user_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.task_id)
        .bind(session_type)
        .fetch_one(&self.pool)
        .await?;

        let sessions = rows
            .iter()
            .map(map_session_with_task)
            .collect::<Result<Vec<_>>>()?;

        Ok((sessions, total_count))
    }

    /// Fetch one session scoped to its owner
    pub async fn find_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<SessionWithTask>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SESSION_COLUMNS}, t.title AS task_title, t.category AS task_category
            FROM focus_sessions fs
            LEFT JOIN tasks t ON t.id = fs.task_id
            WHERE fs.id = $1 AND fs.user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(map_session_with_task(&row)?)),
            None => Ok(None),
        }
    }

    /// Delete one session scoped to its owner, returning the deleted record
    pub async fn delete_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<FocusSession>> {
        let row = sqlx::query(
            r#"
            DELETE FROM focus_sessions
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, task_id, start_at, end_at, duration_sec, interrupted,
                      session_type, notes, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(map_session(&row)?)),
            None => Ok(None),
        }
    }
}

fn map_session(row: &PgRow) -> Result<FocusSession> {
    let session_type: String = row.get("session_type");
    let session_type = SessionType::parse(&session_type)
        .ok_or_else(|| anyhow::anyhow!("unknown session type: {session_type}"))?;

    Ok(FocusSession {
        id: row.get("id"),
        user_id: row.get("user_id"),
        task_id: row.get("task_id"),
        start_at: row.get("start_at"),
        end_at: row.get("end_at"),
        duration_sec: row.get("duration_sec"),
        interrupted: row.get("interrupted"),
        session_type,
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn map_session_with_task(row: &PgRow) -> Result<SessionWithTask> {
    let session = map_session(row)?;
    let task = match (session.task_id, row.get::<Option<String>, _>("task_title")) {
        (Some(id), Some(title)) => Some(TaskRef {
            id,
            title,
            category: row.get("task_category"),
        }),
        _ => None,
    };

    Ok(SessionWithTask { session, task })
}
