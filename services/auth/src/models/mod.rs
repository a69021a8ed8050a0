//! Authentication service models

pub mod user;

// Re-export for convenience
pub use user::{FocusDefaults, NewUser, SettingsPatch, Theme, User, UserSettings};
