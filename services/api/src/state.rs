//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    focus::{
        aggregator::TaskDurationAggregator, analytics::AnalyticsEngine, lifecycle::FocusLifecycle,
        registry::ActiveSessionStore,
    },
    repositories::{
        focus::FocusRepository, reminder::ReminderRepository, suggestion::SuggestionRepository,
        task::TaskRepository,
    },
    suggestions::{OpenAiConfig, SuggestionService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub task_repository: TaskRepository,
    pub reminder_repository: ReminderRepository,
    pub lifecycle: FocusLifecycle,
    pub analytics: AnalyticsEngine,
    pub suggestions: SuggestionService,
}

impl AppState {
    pub fn new(db_pool: PgPool, store: Arc<dyn ActiveSessionStore>) -> Self {
        let task_repository = TaskRepository::new(db_pool.clone());
        let focus_repository = FocusRepository::new(db_pool.clone());
        let reminder_repository = ReminderRepository::new(db_pool.clone());
        let suggestion_repository = SuggestionRepository::new(db_pool.clone());
        let aggregator = TaskDurationAggregator::new(db_pool.clone());

        let lifecycle = FocusLifecycle::new(
            store,
            focus_repository,
            task_repository.clone(),
            aggregator,
        );
        let analytics = AnalyticsEngine::new(db_pool.clone());
        let suggestions = SuggestionService::new(
            db_pool.clone(),
            OpenAiConfig::from_env(),
            suggestion_repository,
            task_repository.clone(),
        );

        Self {
            db_pool,
            task_repository,
            reminder_repository,
            lifecycle,
            analytics,
            suggestions,
        }
    }
}
