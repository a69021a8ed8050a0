//! Middleware for JWT token validation and authentication

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{AppState, jwt::TokenType, routes::AuthError};

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Extract and validate a bearer access token from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AuthError::Unauthorized("Access token is required".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::Unauthorized("Access token is required".to_string()))?;

    let claims = state
        .jwt_service
        .validate_token(token)
        .map_err(|_| AuthError::Unauthorized("Invalid or expired access token".to_string()))?;

    // Refresh tokens cannot be used to reach protected routes
    if claims.token_type != TokenType::Access {
        return Err(AuthError::Unauthorized(
            "Invalid or expired access token".to_string(),
        ));
    }

    req.extensions_mut().insert(AuthUser { id: claims.sub });

    Ok(next.run(req).await)
}
