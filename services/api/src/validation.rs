//! Request validation helpers
//!
//! Inputs are checked before any state change; every failure maps to a 400
//! with the message describing the offending field.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Parse a path or body identifier, rejecting anything that is not a UUID
pub fn parse_id(value: &str, message: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| ApiError::Validation(message.to_string()))
}

/// Accepts RFC3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_datetime(value: &str, message: &str) -> ApiResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    Err(ApiError::Validation(message.to_string()))
}

/// Trim and bound a required text field
pub fn require_length(value: &str, min: usize, max: usize, message: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trim and bound an optional text field, passing `None` through
pub fn optional_length(
    value: Option<String>,
    max: usize,
    message: &str,
) -> ApiResult<Option<String>> {
    match value {
        Some(text) => {
            let trimmed = text.trim();
            if trimmed.chars().count() > max {
                return Err(ApiError::Validation(message.to_string()));
            }
            Ok(Some(trimmed.to_string()))
        }
        None => Ok(None),
    }
}

/// Bound an integer field
pub fn require_int_range(value: i64, min: i64, max: i64, message: &str) -> ApiResult<()> {
    if value < min || value > max {
        return Err(ApiError::Validation(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid", "Invalid task ID").is_err());
        assert!(parse_id("8e7edd1e-9b2f-4b4a-bb1d-0e5a33ad9f65", "Invalid task ID").is_ok());
    }

    #[test]
    fn test_parse_datetime_accepts_rfc3339_and_dates() {
        let full = parse_datetime("2025-03-01T12:30:00Z", "bad").unwrap();
        assert_eq!(full.hour(), 12);

        let day_only = parse_datetime("2025-03-01", "bad").unwrap();
        assert_eq!(day_only.hour(), 0);

        assert!(parse_datetime("last tuesday", "bad").is_err());
    }

    #[test]
    fn test_require_length_trims_before_checking() {
        let title = require_length("  Write tests  ", 1, 200, "bad").unwrap();
        assert_eq!(title, "Write tests");

        assert!(require_length("   ", 1, 200, "bad").is_err());
        assert!(require_length(&"x".repeat(201), 1, 200, "bad").is_err());
    }

    #[test]
    fn test_optional_length_passes_none_through() {
        assert_eq!(optional_length(None, 10, "bad").unwrap(), None);
        assert!(optional_length(Some("x".repeat(11)), 10, "bad").is_err());
    }

    #[test]
    fn test_require_int_range_bounds() {
        assert!(require_int_range(1, 1, 240, "bad").is_ok());
        assert!(require_int_range(240, 1, 240, "bad").is_ok());
        assert!(require_int_range(0, 1, 240, "bad").is_err());
        assert!(require_int_range(241, 1, 240, "bad").is_err());
    }
}
