//! AI suggestion models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One suggested task inside a daily suggestion document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionItem {
    #[serde(default)]
    pub task_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default = "default_item_priority")]
    pub priority: i32,
    #[serde(default)]
    pub estimated_duration: Option<i32>,
}

fn default_item_priority() -> i32 {
    5
}

/// Feedback a user left on a day's suggestions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionFeedback {
    pub rating: Option<i32>,
    pub comment: Option<String>,
    pub helpful: Option<bool>,
}

/// Daily suggestion document, unique per user per day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub suggestions: Vec<SuggestionItem>,
    pub prompt_used: String,
    pub model_used: String,
    pub tokens_used: i32,
    /// Wall-clock milliseconds spent on the upstream call
    pub generation_duration: i64,
    pub user_feedback: Option<SuggestionFeedback>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
    pub helpful: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_item_defaults() {
        let item: SuggestionItem =
            serde_json::from_str(r#"{"title": "Review PR backlog"}"#).unwrap();
        assert_eq!(item.priority, 5);
        assert!(item.task_id.is_none());
        assert!(item.estimated_duration.is_none());
    }

    #[test]
    fn test_suggestion_item_accepts_full_payload() {
        let raw = r#"{
            "title": "Finish quarterly report",
            "taskId": "8e7edd1e-9b2f-4b4a-bb1d-0e5a33ad9f65",
            "priority": 9,
            "rationale": "Due tomorrow and high priority",
            "estimatedDuration": 90
        }"#;
        let item: SuggestionItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.priority, 9);
        assert_eq!(item.estimated_duration, Some(90));
        assert!(item.task_id.is_some());
    }
}
