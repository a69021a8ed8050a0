//! Session management using Redis

use anyhow::Result;
use common::cache::RedisPool;
use tracing::info;
use uuid::Uuid;

use crate::jwt::JwtService;

/// Session manager for handling user sessions in Redis
///
/// One session per user: the key `session:{user_id}` holds the refresh
/// token that is currently allowed to mint new access tokens.
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    jwt_service: JwtService,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(redis_pool: RedisPool, jwt_service: JwtService) -> Self {
        Self {
            redis_pool,
            jwt_service,
        }
    }

    /// Create or replace the session for a user
    pub async fn create_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Creating session for user: {}", user_id);

        let session_key = format!("session:{}", user_id);
        self.redis_pool
            .set(
                &session_key,
                refresh_token,
                Some(self.jwt_service.refresh_token_expiry()),
            )
            .await?;

        Ok(())
    }

    /// Get the stored refresh token for a user
    pub async fn get_session(&self, user_id: Uuid) -> Result<Option<String>> {
        let session_key = format!("session:{}", user_id);
        let refresh_token = self.redis_pool.get(&session_key).await?;

        Ok(refresh_token)
    }

    /// Delete the session for a user
    pub async fn delete_session(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting session for user: {}", user_id);

        let session_key = format!("session:{}", user_id);
        self.redis_pool.delete(&session_key).await?;

        Ok(())
    }

    /// Delete all sessions for a user (logout from all devices)
    pub async fn delete_all_sessions(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting all sessions for user: {}", user_id);

        // A single session key per user, so dropping it revokes every
        // outstanding refresh token at once.
        self.delete_session(user_id).await?;

        Ok(())
    }

    /// Check that a presented refresh token matches the stored session
    pub async fn is_session_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored_token = self.get_session(user_id).await?;

        match stored_token {
            Some(token) => Ok(token == refresh_token),
            None => Ok(false),
        }
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}
