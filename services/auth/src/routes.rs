//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use common::response::ApiResponse;

use crate::{
    AppState,
    jwt::TokenType,
    middleware::{AuthUser, auth_middleware},
    models::{NewUser, SettingsPatch, User},
    validation::{validate_email, validate_name, validate_password, validate_settings},
};

/// Registration payload
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login payload
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh and logout payload
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

/// Profile update payload
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub settings: Option<SettingsPatch>,
}

/// User plus the freshly issued token pair
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/profile", get(get_profile))
        .route("/auth/profile", put(update_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Register a new user and issue the first token pair
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_name(&payload.name).map_err(AuthError::Validation)?;
    let email = payload.email.trim().to_lowercase();
    validate_email(&email).map_err(AuthError::Validation)?;
    validate_password(&payload.password).map_err(AuthError::Validation)?;

    let existing = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(|e| {
            error!("Failed to look up user by email: {}", e);
            AuthError::InternalServerError
        })?;
    if existing.is_some() {
        return Err(AuthError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let new_user = NewUser {
        name: payload.name.trim().to_string(),
        email,
        password: payload.password,
    };
    let user = state.user_repository.create(&new_user).await.map_err(|e| {
        error!("Failed to create user: {}", e);
        AuthError::InternalServerError
    })?;

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;
    info!("User registered: {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            AuthData {
                user,
                access_token,
                refresh_token,
            },
        )),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = payload.email.trim().to_lowercase();
    validate_email(&email).map_err(AuthError::Validation)?;
    if payload.password.is_empty() {
        return Err(AuthError::Validation("Password is required".to_string()));
    }

    if !state.rate_limiter.is_allowed(&email).await {
        return Err(AuthError::TooManyRequests);
    }

    let user = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(|e| {
            error!("Failed to look up user by email: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or_else(|| AuthError::Unauthorized("Invalid email or password".to_string()))?;

    let password_ok = state
        .user_repository
        .verify_password(&user, &payload.password)
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            AuthError::InternalServerError
        })?;
    if !password_ok {
        return Err(AuthError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;
    state.rate_limiter.reset(&email).await;
    info!("User logged in: {}", user.id);

    Ok(Json(ApiResponse::with_message(
        "Login successful",
        AuthData {
            user,
            access_token,
            refresh_token,
        },
    )))
}

/// Exchange a refresh token for a new token pair
///
/// The presented token must validate, must not be blacklisted, and must
/// match the stored session. Rotation blacklists it for its remaining
/// lifetime so it cannot be replayed.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let token = payload
        .refresh_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::Validation("Refresh token is required".to_string()))?;

    let claims = state
        .jwt_service
        .validate_token(&token)
        .map_err(|_| AuthError::Unauthorized("Invalid or expired refresh token".to_string()))?;
    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    let blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, &token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            AuthError::InternalServerError
        })?;
    if blacklisted {
        return Err(AuthError::Unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    let session_valid = state
        .session_manager
        .is_session_valid(claims.sub, &token)
        .await
        .map_err(|e| {
            error!("Failed to check session: {}", e);
            AuthError::InternalServerError
        })?;
    if !session_valid {
        return Err(AuthError::Unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or_else(|| AuthError::Unauthorized("User no longer exists".to_string()))?;

    let access_token = state.jwt_service.generate_access_token(&user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        AuthError::InternalServerError
    })?;

    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, &user, &token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .create_session(user.id, &new_refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to update session: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .user_repository
        .touch_last_active(user.id)
        .await
        .map_err(|e| {
            error!("Failed to touch last active: {}", e);
            AuthError::InternalServerError
        })?;

    Ok(Json(ApiResponse::with_message(
        "Token refreshed successfully",
        AuthData {
            user,
            access_token,
            refresh_token: new_refresh_token,
        },
    )))
}

/// Logout endpoint
///
/// Blacklists the presented refresh token (when it belongs to the caller)
/// and drops the stored session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    body: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let refresh_token = body
        .and_then(|Json(payload)| payload.refresh_token)
        .filter(|token| !token.is_empty());

    if let Some(token) = refresh_token {
        if let Ok(claims) = state.jwt_service.validate_token(&token) {
            if claims.token_type == TokenType::Refresh && claims.sub == auth_user.id {
                state
                    .jwt_service
                    .blacklist_for_remaining_lifetime(&state.redis_pool, &token, &claims)
                    .await
                    .map_err(|e| {
                        error!("Failed to blacklist token: {}", e);
                        AuthError::InternalServerError
                    })?;
            }
        }
    }

    state
        .session_manager
        .delete_session(auth_user.id)
        .await
        .map_err(|e| {
            error!("Failed to remove session: {}", e);
            AuthError::InternalServerError
        })?;
    info!("User logged out: {}", auth_user.id);

    Ok(Json(ApiResponse::message("Logged out successfully")))
}

/// Logout from all devices
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AuthError> {
    state
        .session_manager
        .delete_all_sessions(auth_user.id)
        .await
        .map_err(|e| {
            error!("Failed to remove sessions: {}", e);
            AuthError::InternalServerError
        })?;
    info!("User logged out from all devices: {}", auth_user.id);

    Ok(Json(ApiResponse::message(
        "Logged out from all devices successfully",
    )))
}

/// Fetch the authenticated user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::data(json!({ "user": user }))))
}

/// Update the authenticated user's name and/or settings
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let name = match payload.name {
        Some(name) => {
            validate_name(&name).map_err(AuthError::Validation)?;
            Some(name.trim().to_string())
        }
        None => None,
    };

    let settings = match payload.settings {
        Some(patch) => {
            let current = state
                .user_repository
                .find_by_id(auth_user.id)
                .await
                .map_err(|e| {
                    error!("Failed to load user: {}", e);
                    AuthError::InternalServerError
                })?
                .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

            let merged = current.settings.merged_with(&patch);
            validate_settings(&merged).map_err(AuthError::Validation)?;
            Some(merged)
        }
        None => None,
    };

    let user = state
        .user_repository
        .update_profile(auth_user.id, name.as_deref(), settings.as_ref())
        .await
        .map_err(|e| {
            error!("Failed to update profile: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        json!({ "user": user }),
    )))
}

/// Issue a fresh access/refresh pair, store the session, and record the
/// login activity
async fn issue_tokens(state: &AppState, user: &User) -> Result<(String, String), AuthError> {
    let access_token = state.jwt_service.generate_access_token(user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        AuthError::InternalServerError
    })?;

    let refresh_token = state.jwt_service.generate_refresh_token(user).map_err(|e| {
        error!("Failed to generate refresh token: {}", e);
        AuthError::InternalServerError
    })?;

    state
        .session_manager
        .create_session(user.id, &refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to store session: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .user_repository
        .touch_last_active(user.id)
        .await
        .map_err(|e| {
            error!("Failed to touch last active: {}", e);
            AuthError::InternalServerError
        })?;

    Ok((access_token, refresh_token))
}

/// Custom error type for authentication errors
#[derive(Debug)]
pub enum AuthError {
    Validation(String),
    Unauthorized(String),
    Conflict(String),
    NotFound(String),
    TooManyRequests,
    InternalServerError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AuthError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            AuthError::Conflict(message) => (StatusCode::CONFLICT, message),
            AuthError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AuthError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many login attempts. Please try again later.".to_string(),
            ),
            AuthError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_auth_error_envelope() {
        let response =
            AuthError::Conflict("User with this email already exists".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "User with this email already exists");
    }

    #[tokio::test]
    async fn test_rate_limit_error_status() {
        let response = AuthError::TooManyRequests.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Too many login attempts. Please try again later."
        );
    }

    #[test]
    fn test_refresh_request_tolerates_missing_token() {
        let parsed: RefreshTokenRequest = serde_json::from_str("{}").unwrap();
        assert!(parsed.refresh_token.is_none());

        let parsed: RefreshTokenRequest =
            serde_json::from_str(r#"{"refreshToken": "abc"}"#).unwrap();
        assert_eq!(parsed.refresh_token.as_deref(), Some("abc"));
    }
}
