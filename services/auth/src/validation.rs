//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::UserSettings;

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if !(2..=100).contains(&len) {
        return Err("Name must be between 2 and 100 characters".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() || email.len() > 254 {
        return Err("Please enter a valid email".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Please enter a valid email".to_string());
    }

    Ok(())
}

/// Validate password length
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if !(6..=128).contains(&len) {
        return Err("Password must be between 6 and 128 characters".to_string());
    }

    Ok(())
}

/// Validate the Pomodoro durations inside a settings document
pub fn validate_settings(settings: &UserSettings) -> Result<(), String> {
    let defaults = &settings.focus_defaults;

    if !(1..=180).contains(&defaults.work) {
        return Err("Work duration must be between 1 and 180 minutes".to_string());
    }

    if !(1..=60).contains(&defaults.short_break) {
        return Err("Short break must be between 1 and 60 minutes".to_string());
    }

    if !(1..=60).contains(&defaults.long_break) {
        return Err("Long break must be between 1 and 60 minutes".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FocusDefaults;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Ada Lovelace").is_ok());
        assert!(validate_name("  Al  ").is_ok());
        assert!(validate_name("A").is_err());
        assert!(validate_name(" A ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_settings_ranges() {
        let mut settings = UserSettings::default();
        assert!(validate_settings(&settings).is_ok());

        settings.focus_defaults = FocusDefaults {
            work: 181,
            ..FocusDefaults::default()
        };
        assert!(validate_settings(&settings).is_err());

        settings.focus_defaults = FocusDefaults {
            work: 180,
            short_break: 0,
            long_break: 15,
        };
        assert!(validate_settings(&settings).is_err());

        settings.focus_defaults = FocusDefaults {
            work: 1,
            short_break: 60,
            long_break: 60,
        };
        assert!(validate_settings(&settings).is_ok());
    }
}
