//! Focus session models
//!
//! An active session lives only in the in-process registry until it is
//! ended; the persisted `FocusSession` record is immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of focus session, serialized with its wire name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    #[default]
    #[serde(rename = "work")]
    Work,
    #[serde(rename = "shortBreak")]
    ShortBreak,
    #[serde(rename = "longBreak")]
    LongBreak,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "shortBreak",
            SessionType::LongBreak => "longBreak",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "work" => Some(SessionType::Work),
            "shortBreak" => Some(SessionType::ShortBreak),
            "longBreak" => Some(SessionType::LongBreak),
            _ => None,
        }
    }
}

/// A session currently being tracked for a user
///
/// Presence in the registry is what makes a user "active"; there is no
/// separate ended flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub session_type: SessionType,
    pub start_at: DateTime<Utc>,
    /// Planned length in minutes, purely informational
    pub estimated_duration: Option<i64>,
}

/// Active session snapshot with derived elapsed seconds
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionView {
    #[serde(flatten)]
    pub session: ActiveSession,
    pub elapsed: i64,
}

/// A completed, persisted focus session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_sec: i64,
    pub interrupted: bool,
    pub session_type: SessionType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Title/category of the task a session was recorded against
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
}

/// Persisted session joined with its task reference for list/detail views
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithTask {
    #[serde(flatten)]
    pub session: FocusSession,
    pub task: Option<TaskRef>,
}

/// `{seconds, minutes}` summary attached to the end-session response
#[derive(Debug, Serialize)]
pub struct DurationSummary {
    pub seconds: i64,
    pub minutes: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub task_id: Option<String>,
    pub session_type: Option<String>,
    pub estimated_duration: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    pub session_id: Option<String>,
    pub interrupted: Option<bool>,
    pub notes: Option<String>,
}

/// Query parameters for the session history listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub task_id: Option<String>,
    pub session_type: Option<String>,
}

/// Query parameters for the analytics endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub period: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionType::ShortBreak).unwrap(),
            "\"shortBreak\""
        );
        assert_eq!(SessionType::parse("longBreak"), Some(SessionType::LongBreak));
        assert_eq!(SessionType::parse("nap"), None);
        assert_eq!(SessionType::default(), SessionType::Work);
    }

    #[test]
    fn test_active_session_serializes_camel_case() {
        let session = ActiveSession {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            task_id: None,
            session_type: SessionType::Work,
            start_at: Utc::now(),
            estimated_duration: Some(25),
        };

        let value = serde_json::to_value(&session).unwrap();
        assert!(value.get("startAt").is_some());
        assert!(value.get("estimatedDuration").is_some());
        assert!(value.get("start_at").is_none());
    }

    #[test]
    fn test_active_view_flattens_session_fields() {
        let view = ActiveSessionView {
            session: ActiveSession {
                id: Uuid::nil(),
                user_id: Uuid::nil(),
                task_id: None,
                session_type: SessionType::Work,
                start_at: Utc::now(),
                estimated_duration: None,
            },
            elapsed: 42,
        };

        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["elapsed"], 42);
        assert!(value.get("sessionType").is_some());
        assert!(value.get("session").is_none());
    }
}
