//! Common library for the TaskMate backend
//!
//! This crate provides shared functionality used across the TaskMate
//! services, including database connectivity, Redis caching, error
//! handling, pagination and the standard API response envelope.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
pub mod pagination;
pub mod response;
