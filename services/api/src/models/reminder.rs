//! Reminder models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recurrence document stored as JSONB on a reminder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub pattern: RecurrencePattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
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

/// A reminder as returned by the API
///
/// The trigger time is stored as `remind_at` and serialized as `when`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: Option<String>,
    #[serde(rename = "when")]
    pub remind_at: DateTime<Utc>,
    pub recurring: Recurrence,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderRequest {
    pub title: String,
    pub message: Option<String>,
    #[serde(rename = "when")]
    pub when: Option<String>,
    pub recurring: Option<Recurrence>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminderRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "when")]
    pub when: Option<String>,
    pub recurring: Option<Recurrence>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Defaults to listing active reminders
    pub active: Option<String>,
    /// "true" restricts to future, undelivered reminders
    pub upcoming: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remind_at_serializes_as_when() {
        let reminder = Reminder {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "Stand up".to_string(),
            message: None,
            remind_at: Utc::now(),
            recurring: Recurrence::default(),
            delivered: false,
            delivered_at: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&reminder).unwrap();
        assert!(value.get("when").is_some());
        assert!(value.get("remindAt").is_none());
    }

    #[test]
    fn test_recurrence_defaults() {
        let recurrence: Recurrence = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        assert!(recurrence.enabled);
        assert_eq!(recurrence.pattern, RecurrencePattern::Daily);
        assert!(recurrence.end_date.is_none());
    }
}
