//! Repositories for database operations

pub mod focus;
pub mod reminder;
pub mod suggestion;
pub mod task;
