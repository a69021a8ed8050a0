//! Standard API response envelope
//!
//! All TaskMate endpoints wrap their payloads in
//! `{ "success": bool, "message"?: string, "data"?: ... }`.

use serde::{Deserialize, Serialize};

/// Response envelope shared by all services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying only data
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Successful response with a message and data
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message (no data payload)
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::data(json!({"id": 1}))).unwrap();
        assert_eq!(body, json!({"success": true, "data": {"id": 1}}));
    }

    #[test]
    fn test_message_only_envelope_omits_data() {
        let body = serde_json::to_value(ApiResponse::message("Task deleted")).unwrap();
        assert_eq!(body, json!({"success": true, "message": "Task deleted"}));
    }
}
