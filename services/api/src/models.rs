//! API models for request and response payloads

pub mod focus;
pub mod reminder;
pub mod suggestion;
pub mod task;
