//! User persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::User;
use crate::uuid::uuidv7;

/// Name of the unique index on `users.email`.
pub const USERS_EMAIL_KEY: &str = "users_email_key";
/// Name of the unique index on `users.username`.
pub const USERS_USERNAME_KEY: &str = "users_username_key";

/// Storage for user accounts. Email and username are each unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    /// Insert an active user. Uniqueness conflicts surface as
    /// `DuplicateEmail` / `DuplicateUsername`.
    async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, AuthError>;
}

/// `UserStore` backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, is_active, created_at, updated_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, username, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }
}

/// Translate a unique-index violation on insert into the matching duplicate error.
fn map_insert_error(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        match db.constraint() {
            Some(USERS_EMAIL_KEY) => return AuthError::DuplicateEmail,
            Some(USERS_USERNAME_KEY) => return AuthError::DuplicateUsername,
            _ => {}
        }
    }
    AuthError::Db(e)
}
