//! Focus-session lifecycle
//!
//! A user is either idle or active. `start` moves idle -> active by
//! inserting into the registry; `end` moves active -> idle by claiming the
//! registry entry and persisting an immutable FocusSession record. Every
//! other combination is rejected without changing state.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use common::pagination::{Page, PageParams, Pagination};

use crate::{
    error::{ApiError, ApiResult},
    focus::{
        aggregator::TaskDurationAggregator, registry::ActiveSessionStore, seconds_to_minutes,
    },
    models::focus::{
        ActiveSession, ActiveSessionView, DurationSummary, EndSessionRequest, FocusSession,
        SessionListQuery, SessionType, SessionWithTask, StartSessionRequest,
    },
    repositories::{
        focus::{FocusRepository, NewFocusSession, SessionFilter},
        task::TaskRepository,
    },
    validation::{optional_length, parse_datetime, parse_id, require_int_range},
};

#[derive(Clone)]
pub struct FocusLifecycle {
    store: Arc<dyn ActiveSessionStore>,
    sessions: FocusRepository,
    tasks: TaskRepository,
    aggregator: TaskDurationAggregator,
}

impl FocusLifecycle {
    pub fn new(
        store: Arc<dyn ActiveSessionStore>,
        sessions: FocusRepository,
        tasks: TaskRepository,
        aggregator: TaskDurationAggregator,
    ) -> Self {
        Self {
            store,
            sessions,
            tasks,
            aggregator,
        }
    }

    /// Begin tracking a session for the user
    ///
    /// Rejected with a conflict carrying the live session when one is
    /// already active. The registry insert is atomic, so two concurrent
    /// starts cannot both succeed.
    pub async fn start(
        &self,
        user_id: Uuid,
        request: &StartSessionRequest,
    ) -> ApiResult<ActiveSession> {
        let session_type = match request.session_type.as_deref() {
            Some(value) => SessionType::parse(value).ok_or_else(|| {
                ApiError::Validation(
                    "Session type must be work, shortBreak, or longBreak".to_string(),
                )
            })?,
            None => SessionType::default(),
        };

        if let Some(minutes) = request.estimated_duration {
            require_int_range(
                minutes,
                1,
                240,
                "Estimated duration must be between 1 and 240 minutes",
            )?;
        }

        let task_id = match request.task_id.as_deref() {
            Some(value) => Some(parse_id(value, "Task ID must be a valid UUID")?),
            None => None,
        };

        if let Some(existing) = self.store.get(user_id).await {
            return Err(already_active(existing));
        }

        if let Some(task_id) = task_id {
            let owned = self.tasks.exists(task_id, user_id).await.map_err(|e| {
                error!("Failed to verify task ownership: {}", e);
                ApiError::InternalServerError
            })?;
            if !owned {
                return Err(ApiError::NotFound("Task not found".to_string()));
            }
        }

        let session = ActiveSession {
            id: Uuid::new_v4(),
            user_id,
            task_id,
            session_type,
            start_at: Utc::now(),
            estimated_duration: request.estimated_duration,
        };

        if let Err(existing) = self.store.try_put(user_id, session.clone()).await {
            warn!("Rejected concurrent session start for user {}", user_id);
            return Err(already_active(existing));
        }

        info!("Focus session {} started for user {}", session.id, user_id);
        Ok(session)
    }

    /// End the user's active session and persist it
    ///
    /// The registry entry is removed only once the record is stored; on a
    /// persistence failure the session is restored so the client can retry.
    pub async fn end(
        &self,
        user_id: Uuid,
        request: &EndSessionRequest,
    ) -> ApiResult<(FocusSession, DurationSummary)> {
        let notes = optional_length(
            request.notes.clone(),
            500,
            "Notes cannot exceed 500 characters",
        )?;
        let expected_id = match request.session_id.as_deref() {
            Some(value) => Some(parse_id(value, "Session ID must be a valid UUID")?),
            None => None,
        };

        // Mismatch is checked before the claim so a wrong sessionId never
        // disturbs the live session
        if let Some(expected) = expected_id {
            if let Some(active) = self.store.get(user_id).await {
                if active.id != expected {
                    return Err(ApiError::Validation("Session ID mismatch".to_string()));
                }
            }
        }

        // Atomic claim: a concurrent end for the same user finds the slot
        // empty and gets a 404
        let Some(active) = self.store.remove(user_id).await else {
            return Err(ApiError::NotFound("No active session found".to_string()));
        };

        // The slot can change hands between the precheck and the claim
        if let Some(expected) = expected_id {
            if active.id != expected {
                self.store.put(user_id, active).await;
                return Err(ApiError::Validation("Session ID mismatch".to_string()));
            }
        }

        let end_at = Utc::now();
        let duration_sec = (end_at - active.start_at).num_seconds().max(0);

        let record = NewFocusSession {
            user_id,
            task_id: active.task_id,
            start_at: active.start_at,
            end_at,
            duration_sec,
            interrupted: request.interrupted.unwrap_or(false),
            session_type: active.session_type,
            notes,
        };

        let session = match self.sessions.insert(&record).await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to persist focus session: {}", e);
                // Restore the claimed session; the restore wins over any
                // start that slipped in meanwhile
                self.store.put(user_id, active).await;
                return Err(ApiError::InternalServerError);
            }
        };

        if session.session_type == SessionType::Work {
            if let Some(task_id) = session.task_id {
                self.aggregator.recompute(task_id).await;
            }
        }

        info!(
            "Focus session {} ended for user {} after {}s",
            session.id, user_id, duration_sec
        );

        let summary = DurationSummary {
            seconds: duration_sec,
            minutes: seconds_to_minutes(duration_sec),
        };
        Ok((session, summary))
    }

    /// Snapshot of the user's active session with elapsed seconds
    pub async fn active(&self, user_id: Uuid) -> Option<ActiveSessionView> {
        let session = self.store.get(user_id).await?;
        let elapsed = (Utc::now() - session.start_at).num_seconds().max(0);
        Some(ActiveSessionView { session, elapsed })
    }

    /// Page through the user's persisted sessions, newest first
    pub async fn list(
        &self,
        user_id: Uuid,
        query: &SessionListQuery,
    ) -> ApiResult<(Vec<SessionWithTask>, Pagination)> {
        let filter = SessionFilter {
            start_date: match query.start_date.as_deref() {
                Some(value) => {
                    Some(parse_datetime(value, "Start date must be a valid ISO8601 date")?)
                }
                None => None,
            },
            end_date: match query.end_date.as_deref() {
                Some(value) => Some(parse_datetime(value, "End date must be a valid ISO8601 date")?),
                None => None,
            },
            task_id: match query.task_id.as_deref() {
                Some(value) => Some(parse_id(value, "Task ID must be a valid UUID")?),
                None => None,
            },
            session_type: match query.session_type.as_deref() {
                Some(value) => Some(SessionType::parse(value).ok_or_else(|| {
                    ApiError::Validation(
                        "Session type must be work, shortBreak, or longBreak".to_string(),
                    )
                })?),
                None => None,
            },
        };

        let page = Page::from_params(&PageParams {
            page: query.page,
            limit: query.limit,
        });

        let (sessions, total_count) = self
            .sessions
            .find_with_task(user_id, &filter, page)
            .await
            .map_err(|e| {
                error!("Failed to list focus sessions: {}", e);
                ApiError::InternalServerError
            })?;

        Ok((sessions, Pagination::new(page, total_count)))
    }

    /// Fetch one persisted session scoped to its owner
    pub async fn get(&self, user_id: Uuid, id: &str) -> ApiResult<SessionWithTask> {
        let id = parse_id(id, "Invalid session ID")?;

        self.sessions
            .find_by_id(id, user_id)
            .await
            .map_err(|e| {
                error!("Failed to fetch focus session: {}", e);
                ApiError::InternalServerError
            })?
            .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
    }

    /// Delete one persisted session and refresh its task's duration
    pub async fn delete(&self, user_id: Uuid, id: &str) -> ApiResult<()> {
        let id = parse_id(id, "Invalid session ID")?;

        let Some(session) = self.sessions.delete_by_id(id, user_id).await.map_err(|e| {
            error!("Failed to delete focus session: {}", e);
            ApiError::InternalServerError
        })?
        else {
            return Err(ApiError::NotFound("Session not found".to_string()));
        };

        if session.session_type == SessionType::Work {
            if let Some(task_id) = session.task_id {
                self.aggregator.recompute(task_id).await;
            }
        }

        info!("Focus session {} deleted for user {}", session.id, user_id);
        Ok(())
    }
}

fn already_active(existing: ActiveSession) -> ApiError {
    ApiError::Conflict {
        message: "You already have an active session. Please end it first.".to_string(),
        active_session: existing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serial_test::serial;
    use sqlx::PgPool;

    use common::database::{DatabaseConfig, init_pool, run_migrations};

    use crate::focus::{
        aggregator::TaskDurationAggregator,
        analytics::AnalyticsEngine,
        registry::InMemoryActiveSessionStore,
    };
    use crate::models::focus::AnalyticsQuery;

    async fn test_pool() -> PgPool {
        let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
        let pool = init_pool(&config).await.expect("database must be reachable");
        run_migrations(&pool).await.expect("migrations must apply");
        pool
    }

    fn lifecycle_for(pool: &PgPool) -> (FocusLifecycle, Arc<InMemoryActiveSessionStore>) {
        let store = InMemoryActiveSessionStore::new();
        let lifecycle = FocusLifecycle::new(
            store.clone(),
            FocusRepository::new(pool.clone()),
            TaskRepository::new(pool.clone()),
            TaskDurationAggregator::new(pool.clone()),
        );
        (lifecycle, store)
    }

    async fn create_user(pool: &PgPool) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, 'x') RETURNING id",
        )
        .bind("Test User")
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn create_task(pool: &PgPool, user_id: Uuid) -> Uuid {
        sqlx::query_scalar("INSERT INTO tasks (user_id, title) VALUES ($1, 'Deep work') RETURNING id")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn actual_duration(pool: &PgPool, task_id: Uuid) -> i32 {
        sqlx::query_scalar("SELECT actual_duration FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    /// Rewind the active session's start so elapsed time does not have to
    /// pass for real
    async fn backdate_active(
        store: &InMemoryActiveSessionStore,
        user_id: Uuid,
        seconds: i64,
    ) {
        let mut active = store.get(user_id).await.unwrap();
        active.start_at = Utc::now() - Duration::seconds(seconds);
        store.put(user_id, active).await;
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a local Postgres"]
    async fn test_ended_session_persists_elapsed_duration() {
        let pool = test_pool().await;
        let (lifecycle, store) = lifecycle_for(&pool);
        let user_id = create_user(&pool).await;

        lifecycle
            .start(
                user_id,
                &StartSessionRequest {
                    estimated_duration: Some(25),
                    ..StartSessionRequest::default()
                },
            )
            .await
            .unwrap();
        backdate_active(&store, user_id, 1500).await;

        let (session, duration) = lifecycle
            .end(user_id, &EndSessionRequest::default())
            .await
            .unwrap();

        assert_eq!(session.session_type, SessionType::Work);
        assert!(!session.interrupted);
        // The clock keeps running between backdating and ending
        assert!((1500..=1502).contains(&duration.seconds));
        assert_eq!(session.duration_sec, duration.seconds);
        assert!(store.get(user_id).await.is_none());
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a local Postgres"]
    async fn test_second_start_conflicts_and_keeps_the_first() {
        let pool = test_pool().await;
        let (lifecycle, store) = lifecycle_for(&pool);
        let user_id = create_user(&pool).await;

        let first = lifecycle
            .start(user_id, &StartSessionRequest::default())
            .await
            .unwrap();

        let err = lifecycle
            .start(user_id, &StartSessionRequest::default())
            .await
            .unwrap_err();
        let ApiError::Conflict { active_session, .. } = err else {
            panic!("expected a conflict");
        };
        assert_eq!(active_session.id, first.id);
        assert_eq!(store.get(user_id).await.unwrap().id, first.id);
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a local Postgres"]
    async fn test_work_sessions_accumulate_into_task_duration() {
        let pool = test_pool().await;
        let (lifecycle, store) = lifecycle_for(&pool);
        let user_id = create_user(&pool).await;
        let task_id = create_task(&pool, user_id).await;

        for seconds in [600, 900] {
            lifecycle
                .start(
                    user_id,
                    &StartSessionRequest {
                        task_id: Some(task_id.to_string()),
                        ..StartSessionRequest::default()
                    },
                )
                .await
                .unwrap();
            backdate_active(&store, user_id, seconds).await;
            lifecycle
                .end(user_id, &EndSessionRequest::default())
                .await
                .unwrap();
        }

        // round(1500s / 60) = 25 minutes
        assert_eq!(actual_duration(&pool, task_id).await, 25);
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a local Postgres"]
    async fn test_deleting_a_work_session_recomputes_the_task() {
        let pool = test_pool().await;
        let (lifecycle, store) = lifecycle_for(&pool);
        let user_id = create_user(&pool).await;
        let task_id = create_task(&pool, user_id).await;

        lifecycle
            .start(
                user_id,
                &StartSessionRequest {
                    task_id: Some(task_id.to_string()),
                    ..StartSessionRequest::default()
                },
            )
            .await
            .unwrap();
        backdate_active(&store, user_id, 600).await;
        let (session, _) = lifecycle
            .end(user_id, &EndSessionRequest::default())
            .await
            .unwrap();
        assert_eq!(actual_duration(&pool, task_id).await, 10);

        // Recomputing with nothing changed is a no-op
        TaskDurationAggregator::new(pool.clone())
            .recompute(task_id)
            .await;
        assert_eq!(actual_duration(&pool, task_id).await, 10);

        lifecycle
            .delete(user_id, &session.id.to_string())
            .await
            .unwrap();
        assert_eq!(actual_duration(&pool, task_id).await, 0);
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a local Postgres"]
    async fn test_end_with_foreign_session_id_changes_nothing() {
        let pool = test_pool().await;
        let (lifecycle, store) = lifecycle_for(&pool);
        let user_a = create_user(&pool).await;
        let user_b = create_user(&pool).await;

        let session_b = lifecycle
            .start(user_b, &StartSessionRequest::default())
            .await
            .unwrap();

        // User A has no active session at all
        let err = lifecycle
            .end(
                user_a,
                &EndSessionRequest {
                    session_id: Some(session_b.id.to_string()),
                    ..EndSessionRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // User B presenting the wrong id keeps their session live
        let err = lifecycle
            .end(
                user_b,
                &EndSessionRequest {
                    session_id: Some(Uuid::new_v4().to_string()),
                    ..EndSessionRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(store.get(user_b).await.unwrap().id, session_b.id);
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a local Postgres"]
    async fn test_analytics_on_an_empty_window() {
        let pool = test_pool().await;
        let user_id = create_user(&pool).await;
        let engine = AnalyticsEngine::new(pool.clone());

        let report = engine
            .report(
                user_id,
                &AnalyticsQuery {
                    period: Some("7d".to_string()),
                    ..AnalyticsQuery::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(report.overview.total_sessions, 0);
        assert_eq!(report.overview.completion_rate, 100);
        assert_eq!(report.overview.streak_days, 0);
        assert!(report.daily_stats.is_empty());
        assert!(report.top_tasks.is_empty());
        assert!(report.heatmap.is_empty());
    }
}
