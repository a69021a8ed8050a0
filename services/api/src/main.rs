use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod focus;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
mod suggestions;
mod validation;

use common::database::{DatabaseConfig, init_pool, run_migrations};

use crate::{
    focus::registry::{ActiveSessionStore, InMemoryActiveSessionStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting API service");

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

    // Active sessions live in process memory; any session that was
    // running when the last process stopped is gone
    let store = InMemoryActiveSessionStore::new();
    store.clear().await;

    let app_state = AppState::new(pool, store);

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    info!("API service listening on 0.0.0.0:3001");

    axum::serve(listener, app).await?;

    Ok(())
}
