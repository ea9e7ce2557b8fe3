//! Chat session and message persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::chat::{ChatSession, Message, MessageRole};
use crate::uuid::uuidv7;

/// Chat persistence errors.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat session not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Ordered, append-only message logs grouped into user-owned sessions.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Sessions owned by `user_id`, most recently updated first.
    async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<ChatSession>, ChatError>;

    async fn create_session(&self, user_id: &Uuid, title: &str) -> Result<ChatSession, ChatError>;

    /// `None` when the session does not exist or belongs to someone else.
    async fn get_session(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<Option<ChatSession>, ChatError>;

    /// Delete a session and all its messages. Returns whether anything was deleted.
    async fn delete_session(&self, user_id: &Uuid, session_id: &Uuid) -> Result<bool, ChatError>;

    /// Insert a message and bump the session's `updated_at` to the message's
    /// `created_at`, atomically.
    async fn append_message(
        &self,
        session_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, ChatError>;

    /// Full history, oldest first.
    async fn messages(&self, session_id: &Uuid) -> Result<Vec<Message>, ChatError>;
}

/// `ConversationStore` backed by the `chat_sessions` and `messages` tables.
#[derive(Debug, Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<ChatSession>, ChatError> {
        let rows = sqlx::query_as::<_, ChatSession>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM chat_sessions
            WHERE user_id = $1
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_session(&self, user_id: &Uuid, title: &str) -> Result<ChatSession, ChatError> {
        let row = sqlx::query_as::<_, ChatSession>(
            r#"
            INSERT INTO chat_sessions (id, user_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, created_at, updated_at
            "#,
        )
        .bind(uuidv7())
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_session(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<Option<ChatSession>, ChatError> {
        let row = sqlx::query_as::<_, ChatSession>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM chat_sessions
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_session(&self, user_id: &Uuid, session_id: &Uuid) -> Result<bool, ChatError> {
        // Messages go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_message(
        &self,
        session_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, ChatError> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, chat_session_id, role, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, chat_session_id, role, content, created_at
            "#,
        )
        .bind(uuidv7())
        .bind(session_id)
        .bind(role)
        .bind(content)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e
                && db.is_foreign_key_violation()
            {
                return ChatError::NotFound(*session_id);
            }
            ChatError::Db(e)
        })?;

        sqlx::query("UPDATE chat_sessions SET updated_at = $1 WHERE id = $2")
            .bind(message.created_at)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn messages(&self, session_id: &Uuid) -> Result<Vec<Message>, ChatError> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_session_id, role, content, created_at
            FROM messages
            WHERE chat_session_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
