//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User, UserSettings};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, settings, is_email_verified, last_active, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with a freshly hashed password
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.email);

        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, settings)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(Json(UserSettings::default()))
        .fetch_one(&self.pool)
        .await?;

        Ok(map_user(&row))
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_user(&row)))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_user(&row)))
    }

    /// Verify a user's password against the stored hash
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Record activity for a user
    pub async fn touch_last_active(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Update a user's name and/or settings document
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        settings: Option<&UserSettings>,
    ) -> Result<Option<User>> {
        info!("Updating profile for user: {}", id);

        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                settings = COALESCE($3, settings),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(settings.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_user(&row)))
    }
}

fn map_user(row: &PgRow) -> User {
    let settings: Json<UserSettings> = row.get("settings");

    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        settings: settings.0,
        is_email_verified: row.get("is_email_verified"),
        last_active: row.get("last_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
