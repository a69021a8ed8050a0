use anyhow::Result;
use std::env;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

mod reminder_poller;

use common::database::{DatabaseConfig, init_pool, run_migrations};
use reminder_poller::ReminderPoller;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting scheduler service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    // Get configuration from environment variables
    let poll_schedule =
        env::var("SCHEDULER_POLL_SCHEDULE").unwrap_or_else(|_| "0 * * * * *".to_string()); // Default to every minute
    let cleanup_schedule =
        env::var("SCHEDULER_CLEANUP_SCHEDULE").unwrap_or_else(|_| "0 0 3 * * *".to_string()); // Default to 03:00 UTC daily

    // Start the reminder poller
    let poller = ReminderPoller::new(pool);
    let _scheduler = poller.start(&poll_schedule, &cleanup_schedule).await?;

    info!("Scheduler service started successfully");

    // Keep the service running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down scheduler service");

    Ok(())
}
