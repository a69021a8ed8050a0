//! User model and the per-user settings document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity
///
/// The password hash never leaves the service; it is skipped on
/// serialization so profile and auth responses cannot leak it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub settings: UserSettings,
    pub is_email_verified: bool,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user settings stored as a JSONB document
///
/// Missing fields fall back to the defaults, so a row created with `{}`
/// still deserializes into a fully populated settings object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub timezone: String,
    pub focus_defaults: FocusDefaults,
    pub theme: Theme,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            focus_defaults: FocusDefaults::default(),
            theme: Theme::Auto,
        }
    }
}

/// Default Pomodoro durations in minutes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusDefaults {
    pub work: i64,
    pub short_break: i64,
    pub long_break: i64,
}

impl Default for FocusDefaults {
    fn default() -> Self {
        Self {
            work: 25,
            short_break: 5,
            long_break: 15,
        }
    }
}

/// UI theme preference
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

/// New user creation payload, password still in the clear
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial settings update
///
/// Present keys replace the stored value wholesale; `focusDefaults` sent
/// with only some durations gets the missing ones backfilled from the
/// defaults during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub timezone: Option<String>,
    pub focus_defaults: Option<FocusDefaults>,
    pub theme: Option<Theme>,
}

impl UserSettings {
    /// Apply a patch on top of the current settings
    pub fn merged_with(&self, patch: &SettingsPatch) -> UserSettings {
        UserSettings {
            timezone: patch
                .timezone
                .clone()
                .unwrap_or_else(|| self.timezone.clone()),
            focus_defaults: patch
                .focus_defaults
                .clone()
                .unwrap_or_else(|| self.focus_defaults.clone()),
            theme: patch.theme.unwrap_or(self.theme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_document_gets_defaults() {
        let settings: UserSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.focus_defaults.work, 25);
        assert_eq!(settings.focus_defaults.short_break, 5);
        assert_eq!(settings.focus_defaults.long_break, 15);
        assert_eq!(settings.theme, Theme::Auto);
    }

    #[test]
    fn test_partial_focus_defaults_backfill() {
        let patch: SettingsPatch =
            serde_json::from_str(r#"{"focusDefaults": {"work": 50}}"#).unwrap();
        let merged = UserSettings::default().merged_with(&patch);
        assert_eq!(merged.focus_defaults.work, 50);
        assert_eq!(merged.focus_defaults.short_break, 5);
        assert_eq!(merged.focus_defaults.long_break, 15);
    }

    #[test]
    fn test_merge_keeps_unpatched_fields() {
        let mut current = UserSettings::default();
        current.timezone = "Europe/Berlin".to_string();
        current.theme = Theme::Dark;

        let patch: SettingsPatch = serde_json::from_str(r#"{"theme": "light"}"#).unwrap();
        let merged = current.merged_with(&patch);
        assert_eq!(merged.timezone, "Europe/Berlin");
        assert_eq!(merged.theme, Theme::Light);
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            settings: UserSettings::default(),
            is_email_verified: false,
            last_active: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["settings"]["focusDefaults"]["work"], 25);
    }
}
