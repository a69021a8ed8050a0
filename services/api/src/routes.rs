//! API service routes

use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use serde_json::json;

use crate::{middleware::auth_middleware, state::AppState};

pub mod ai;
pub mod focus;
pub mod reminders;
pub mod tasks;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .nest("/api/tasks", tasks::router())
        .nest("/api/focus", focus::router())
        .nest("/api/reminders", reminders::router())
        .nest("/api/ai", ai::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}
