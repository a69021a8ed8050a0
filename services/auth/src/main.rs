use anyhow::Result;
use sqlx::PgPool;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod jwt;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod session;
mod validation;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, init_pool, run_migrations},
};

use crate::{
    jwt::{JwtConfig, JwtService},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    session::SessionManager,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub session_manager: SessionManager,
    pub rate_limiter: RateLimiter,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting authentication service");

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

    // Initialize JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config)?;

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let user_repository = UserRepository::new(pool.clone());
    let session_manager = SessionManager::new(redis_pool.clone(), jwt_service.clone());
    let rate_limiter = RateLimiter::new(RateLimiterConfig::default());

    let app_state = AppState {
        db_pool: pool,
        redis_pool,
        jwt_service,
        user_repository,
        session_manager,
        rate_limiter,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Authentication service listening on 0.0.0.0:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
