//! AI task suggestions
//!
//! Builds a prioritization prompt from the user's open tasks and recent
//! focus history, sends it to an OpenAI-compatible chat-completions
//! endpoint and stores the parsed result, one document per user per day.

use std::{env, time::Instant};

use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Row};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    focus::seconds_to_minutes,
    models::{
        suggestion::{
            AiSuggestion, FeedbackRequest, SuggestionFeedback, SuggestionItem, SuggestionsQuery,
        },
        task::Task,
    },
    repositories::{
        suggestion::{NewSuggestion, SuggestionRepository},
        task::TaskRepository,
    },
    validation::{optional_length, parse_datetime, require_int_range},
};

const INCOMPLETE_TASK_LIMIT: i64 = 20;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
        }
    }
}

/// Seven-day focus summary fed into the prompt
#[derive(Debug, Default)]
struct FocusHistory {
    total_sessions: i64,
    average_minutes: i64,
    top_categories: Vec<CategoryTime>,
}

#[derive(Debug)]
struct CategoryTime {
    category: String,
    minutes: i64,
    sessions: i64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct SuggestionPayload {
    #[serde(default)]
    suggestions: Vec<RawSuggestionItem>,
}

/// Item shape as the model returns it, before ids are checked
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestionItem {
    title: String,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    priority: Option<i32>,
    #[serde(default)]
    estimated_duration: Option<i32>,
}

impl From<RawSuggestionItem> for SuggestionItem {
    fn from(raw: RawSuggestionItem) -> Self {
        SuggestionItem {
            // Anything that does not parse as a UUID is treated as a
            // new-task suggestion rather than a reference
            task_id: raw.task_id.as_deref().and_then(|id| Uuid::parse_str(id).ok()),
            title: raw.title,
            rationale: raw.rationale,
            priority: raw.priority.unwrap_or(5).clamp(1, 10),
            estimated_duration: raw.estimated_duration,
        }
    }
}

#[derive(Clone)]
pub struct SuggestionService {
    pool: PgPool,
    config: OpenAiConfig,
    client: Client,
    suggestions: SuggestionRepository,
    tasks: TaskRepository,
}

impl SuggestionService {
    pub fn new(
        pool: PgPool,
        config: OpenAiConfig,
        suggestions: SuggestionRepository,
        tasks: TaskRepository,
    ) -> Self {
        Self {
            pool,
            config,
            client: Client::new(),
            suggestions,
            tasks,
        }
    }

    /// Return the stored suggestions for the requested day, generating
    /// them on the spot when none exist yet
    pub async fn get_or_generate(
        &self,
        user_id: Uuid,
        query: &SuggestionsQuery,
    ) -> ApiResult<AiSuggestion> {
        self.ensure_configured()?;

        let date = match query.date.as_deref() {
            Some(value) => parse_datetime(value, "Date must be a valid ISO8601 date")?.date_naive(),
            None => Utc::now().date_naive(),
        };

        let stored = self
            .suggestions
            .find_by_date(user_id, date)
            .await
            .map_err(|e| {
                error!("Failed to load stored suggestions: {}", e);
                ApiError::InternalServerError
            })?;

        if let Some(suggestion) = stored {
            return Ok(suggestion);
        }

        self.generate(user_id, date).await
    }

    /// Generate suggestions for the given day, replacing any stored ones
    pub async fn generate(&self, user_id: Uuid, date: NaiveDate) -> ApiResult<AiSuggestion> {
        let api_key = self.ensure_configured()?.to_string();

        let tasks = self
            .tasks
            .incomplete_for_user(user_id, INCOMPLETE_TASK_LIMIT)
            .await
            .map_err(|e| {
                error!("Failed to load tasks for suggestions: {}", e);
                ApiError::InternalServerError
            })?;

        let history = self.focus_history(user_id).await.map_err(|e| {
            error!("Failed to load focus history for suggestions: {}", e);
            ApiError::InternalServerError
        })?;

        let prompt = build_prompt(&tasks, &history, date);

        let started = Instant::now();
        let (items, total_tokens) =
            self.request_completion(&api_key, &prompt).await.map_err(|e| {
                error!("Chat completion request failed: {}", e);
                ApiError::InternalServerError
            })?;
        let generation_duration = started.elapsed().as_millis() as i64;

        let record = NewSuggestion {
            date,
            suggestions: items,
            prompt_used: prompt,
            model_used: self.config.model.clone(),
            tokens_used: total_tokens,
            generation_duration,
        };

        let suggestion = self.suggestions.upsert(user_id, &record).await.map_err(|e| {
            error!("Failed to store generated suggestions: {}", e);
            ApiError::InternalServerError
        })?;

        info!(
            "Generated {} suggestions for user {} on {}",
            suggestion.suggestions.len(),
            user_id,
            date
        );
        Ok(suggestion)
    }

    /// Attach user feedback to an existing suggestion document
    pub async fn feedback(
        &self,
        user_id: Uuid,
        date: &str,
        request: &FeedbackRequest,
    ) -> ApiResult<AiSuggestion> {
        if let Some(rating) = request.rating {
            require_int_range(i64::from(rating), 1, 5, "Rating must be between 1 and 5")?;
        }
        let comment = optional_length(
            request.comment.clone(),
            500,
            "Comment cannot exceed 500 characters",
        )?;
        let date = parse_datetime(date, "Date must be a valid ISO8601 date")?.date_naive();

        let feedback = SuggestionFeedback {
            rating: request.rating,
            comment,
            helpful: request.helpful,
        };

        self.suggestions
            .set_feedback(user_id, date, &feedback)
            .await
            .map_err(|e| {
                error!("Failed to store suggestion feedback: {}", e);
                ApiError::InternalServerError
            })?
            .ok_or_else(|| ApiError::NotFound("Suggestion not found".to_string()))
    }

    fn ensure_configured(&self) -> ApiResult<&str> {
        self.config.api_key.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable(
                "AI service is not configured. OPENAI_API_KEY is missing.".to_string(),
            )
        })
    }

    async fn request_completion(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> anyhow::Result<(Vec<SuggestionItem>, i32)> {
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.7,
            "response_format": {"type": "json_object"},
        });

        let completion = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatCompletion>()
            .await?;

        let total_tokens = completion
            .usage
            .map(|usage| usage.total_tokens)
            .unwrap_or(0);

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("completion returned no choices"))?;

        Ok((parse_items(&content)?, total_tokens))
    }

    async fn focus_history(&self, user_id: Uuid) -> anyhow::Result<FocusHistory> {
        let since = Utc::now() - Duration::days(7);

        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_sessions,
                   COALESCE(AVG(duration_sec), 0)::float8 AS average_seconds
            FROM focus_sessions
            WHERE user_id = $1 AND start_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let categories = sqlx::query(
            r#"
            SELECT t.category AS category,
                   COALESCE(SUM(fs.duration_sec), 0)::bigint AS total_seconds,
                   COUNT(*) AS sessions
            FROM focus_sessions fs
            JOIN tasks t ON t.id = fs.task_id
            WHERE fs.user_id = $1 AND fs.start_at >= $2
              AND fs.session_type = 'work' AND t.category IS NOT NULL
            GROUP BY t.category
            ORDER BY total_seconds DESC
            LIMIT 5
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let average_seconds: f64 = totals.get("average_seconds");

        Ok(FocusHistory {
            total_sessions: totals.get("total_sessions"),
            average_minutes: (average_seconds / 60.0).round() as i64,
            top_categories: categories
                .iter()
                .map(|row| CategoryTime {
                    category: row.get("category"),
                    minutes: seconds_to_minutes(row.get("total_seconds")),
                    sessions: row.get("sessions"),
                })
                .collect(),
        })
    }
}

fn parse_items(content: &str) -> anyhow::Result<Vec<SuggestionItem>> {
    let payload: SuggestionPayload = serde_json::from_str(content)?;
    Ok(payload
        .suggestions
        .into_iter()
        .map(SuggestionItem::from)
        .collect())
}

fn build_prompt(tasks: &[Task], history: &FocusHistory, date: NaiveDate) -> String {
    let mut prompt = format!(
        "You are a productivity assistant helping with daily task prioritization.\n\n\
         Today's Date: {}\n\n\
         User Context:\n\
         - Incomplete Tasks: {} tasks remaining\n\
         - Recent Focus History: {} sessions in last 7 days\n\
         - Average Session Length: {} minutes\n\n\
         Incomplete Tasks:\n",
        date, tasks.len(), history.total_sessions, history.average_minutes
    );

    for task in tasks {
        let due = match task.due_date {
            Some(due) => due.date_naive().to_string(),
            None => "No due date".to_string(),
        };
        prompt.push_str(&format!(
            "- {} (ID: {}, Priority: {}/5, Category: {}, Due: {})\n",
            task.title,
            task.id,
            task.priority,
            task.category.as_deref().unwrap_or("None"),
            due
        ));
    }

    prompt.push_str("\nRecent Focus Patterns:\n");
    for entry in &history.top_categories {
        prompt.push_str(&format!(
            "- {}: {} minutes across {} sessions\n",
            entry.category, entry.minutes, entry.sessions
        ));
    }

    prompt.push_str(
        "\nPlease suggest 3-5 tasks for today, prioritized by:\n\
         1. Urgency (due dates, overdue items)\n\
         2. Importance (high priority tasks)\n\
         3. Focus momentum (categories user has been working on)\n\
         4. Task size (mix of quick wins and deep work)\n\n\
         For each suggestion, provide:\n\
         - Task title (if existing task) or suggested new task\n\
         - Priority score (1-10)\n\
         - Rationale (1-2 sentences)\n\
         - Estimated duration in minutes\n\n\
         Respond in JSON format:\n\
         {\"suggestions\": [{\"title\": \"Task name\", \"taskId\": \"existing-task-uuid-or-null\", \
         \"priority\": 8, \"rationale\": \"Why this task should be prioritized today\", \
         \"estimatedDuration\": 45}]}",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, priority: i32, category: Option<&str>) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            category: category.map(String::from),
            priority,
            due_date: None,
            tags: Vec::new(),
            completed: false,
            completed_at: None,
            archived: false,
            estimated_duration: None,
            actual_duration: 0,
            is_overdue: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_prompt_lists_tasks_and_patterns() {
        let tasks = vec![
            task("Write launch notes", 5, Some("Writing")),
            task("Clear inbox", 2, None),
        ];
        let history = FocusHistory {
            total_sessions: 9,
            average_minutes: 24,
            top_categories: vec![CategoryTime {
                category: "Writing".to_string(),
                minutes: 120,
                sessions: 4,
            }],
        };
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        let prompt = build_prompt(&tasks, &history, date);

        assert!(prompt.contains("Today's Date: 2025-06-15"));
        assert!(prompt.contains("Incomplete Tasks: 2 tasks remaining"));
        assert!(prompt.contains("9 sessions in last 7 days"));
        assert!(prompt.contains("Priority: 5/5, Category: Writing, Due: No due date"));
        assert!(prompt.contains("Category: None"));
        assert!(prompt.contains("- Writing: 120 minutes across 4 sessions"));
        assert!(prompt.contains("Respond in JSON format"));
    }

    #[test]
    fn test_parse_items_drops_placeholder_ids() {
        let content = r#"{
            "suggestions": [
                {"title": "Finish report", "taskId": "existing_task_id_or_null", "priority": 12},
                {"title": "Plan sprint", "taskId": "8e7edd1e-9b2f-4b4a-bb1d-0e5a33ad9f65"}
            ]
        }"#;

        let items = parse_items(content).unwrap();

        assert_eq!(items.len(), 2);
        assert!(items[0].task_id.is_none());
        assert_eq!(items[0].priority, 10);
        assert!(items[1].task_id.is_some());
        assert_eq!(items[1].priority, 5);
    }

    #[test]
    fn test_parse_items_rejects_non_json() {
        assert!(parse_items("Here are your tasks for today!").is_err());
    }

    #[test]
    fn test_completion_deserializes_without_usage() {
        let raw = r#"{
            "choices": [{"message": {"content": "{\"suggestions\": []}"}}]
        }"#;

        let completion: ChatCompletion = serde_json::from_str(raw).unwrap();

        assert!(completion.usage.is_none());
        assert_eq!(completion.choices.len(), 1);
    }
}
