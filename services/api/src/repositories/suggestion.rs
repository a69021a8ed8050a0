//! AI suggestion repository for database operations

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use crate::models::suggestion::{AiSuggestion, SuggestionFeedback, SuggestionItem};

/// Generation output stored as one document per user per day
#[derive(Debug)]
pub struct NewSuggestion {
    pub date: NaiveDate,
    pub suggestions: Vec<SuggestionItem>,
    pub prompt_used: String,
    pub model_used: String,
    pub tokens_used: i32,
    pub generation_duration: i64,
}

/// AI suggestion repository for database operations
#[derive(Clone)]
pub struct SuggestionRepository {
    pool: PgPool,
}

const SUGGESTION_COLUMNS: &str = "id, user_id, date, suggestions, prompt_used, model_used, \
     tokens_used, generation_duration, user_feedback, created_at, updated_at";

impl SuggestionRepository {
    /// Create a new suggestion repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the document for a given day, if any
    pub async fn find_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AiSuggestion>> {
        let row = sqlx::query(&format!(
            "SELECT {SUGGESTION_COLUMNS} FROM ai_suggestions WHERE user_id = $1 AND date = $2"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_suggestion(&row)))
    }

    /// Insert or replace the day's document (regeneration overwrites)
    pub async fn upsert(&self, user_id: Uuid, suggestion: &NewSuggestion) -> Result<AiSuggestion> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ai_suggestions
                (user_id, date, suggestions, prompt_used, model_used, tokens_used, generation_duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, date) DO UPDATE SET
                suggestions = EXCLUDED.suggestions,
                prompt_used = EXCLUDED.prompt_used,
                model_used = EXCLUDED.model_used,
                tokens_used = EXCLUDED.tokens_used,
                generation_duration = EXCLUDED.generation_duration,
                updated_at = NOW()
            RETURNING {SUGGESTION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(suggestion.date)
        .bind(Json(&suggestion.suggestions))
        .bind(&suggestion.prompt_used)
        .bind(&suggestion.model_used)
        .bind(suggestion.tokens_used)
        .bind(suggestion.generation_duration)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_suggestion(&row))
    }

    /// Attach user feedback to the day's document
    pub async fn set_feedback(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        feedback: &SuggestionFeedback,
    ) -> Result<Option<AiSuggestion>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE ai_suggestions
            SET user_feedback = $3, updated_at = NOW()
            WHERE user_id = $1 AND date = $2
            RETURNING {SUGGESTION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(date)
        .bind(Json(feedback))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_suggestion(&row)))
    }
}

fn map_suggestion(row: &PgRow) -> AiSuggestion {
    let Json(suggestions): Json<Vec<SuggestionItem>> = row.get("suggestions");
    let user_feedback = row
        .get::<Option<Json<SuggestionFeedback>>, _>("user_feedback")
        .map(|Json(feedback)| feedback);

    AiSuggestion {
        id: row.get("id"),
        user_id: row.get("user_id"),
        date: row.get("date"),
        suggestions,
        prompt_used: row.get("prompt_used"),
        model_used: row.get("model_used"),
        tokens_used: row.get("tokens_used"),
        generation_duration: row.get("generation_duration"),
        user_feedback,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
