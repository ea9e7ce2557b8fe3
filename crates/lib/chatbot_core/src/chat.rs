//! Chat service: session CRUD and conversation turns.
//!
//! A turn appends the user's message, replays the full history through the
//! [`ReplyGenerator`], and appends the reply as an assistant message. A failed
//! generation never fails the turn; the user gets [`APOLOGY_MESSAGE`] instead.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::conversations::{ChatError, ConversationStore};
use crate::models::chat::{ChatSession, Message, MessageRole};
use crate::reply::ReplyGenerator;

/// Stored as the assistant reply when generation fails.
pub const APOLOGY_MESSAGE: &str =
    "I apologize, but I'm having trouble connecting to the AI service. Please try again later.";

/// Title given to sessions created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

pub const MAX_TITLE_LEN: usize = 255;

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    generator: Arc<dyn ReplyGenerator>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ConversationStore>, generator: Arc<dyn ReplyGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<ChatSession>, ChatError> {
        self.store.list_sessions(user_id).await
    }

    /// Blank or missing titles become [`DEFAULT_SESSION_TITLE`].
    pub async fn create_session(
        &self,
        user_id: &Uuid,
        title: Option<&str>,
    ) -> Result<ChatSession, ChatError> {
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => DEFAULT_SESSION_TITLE,
        };
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ChatError::Validation(format!(
                "Title must be at most {MAX_TITLE_LEN} characters"
            )));
        }

        let session = self.store.create_session(user_id, title).await?;
        info!(session_id = %session.id, %user_id, "created chat session");
        Ok(session)
    }

    /// The session and its ordered history, if `user_id` owns it.
    pub async fn get_session_with_messages(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<(ChatSession, Vec<Message>), ChatError> {
        let session = self.owned_session(user_id, session_id).await?;
        let messages = self.store.messages(&session.id).await?;
        Ok((session, messages))
    }

    pub async fn delete_session(&self, user_id: &Uuid, session_id: &Uuid) -> Result<(), ChatError> {
        if !self.store.delete_session(user_id, session_id).await? {
            return Err(ChatError::NotFound(*session_id));
        }
        info!(%session_id, %user_id, "deleted chat session");
        Ok(())
    }

    /// Run a turn in a session owned by `user_id`.
    pub async fn send_message(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
        content: &str,
    ) -> Result<Message, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::Validation("Message content is empty".into()));
        }
        let session = self.owned_session(user_id, session_id).await?;
        self.process_turn(&session.id, content).await
    }

    /// Append `content` as a user message and return the stored assistant reply.
    ///
    /// Ownership is not checked here; see [`ChatService::send_message`].
    pub async fn process_turn(&self, session_id: &Uuid, content: &str) -> Result<Message, ChatError> {
        self.store
            .append_message(session_id, MessageRole::User, content)
            .await?;

        let history = self.store.messages(session_id).await?;

        let reply = match self.generator.generate(&history).await {
            Ok(text) => text,
            Err(e) => {
                warn!(%session_id, error = %e, "reply generation failed");
                APOLOGY_MESSAGE.to_string()
            }
        };

        self.store
            .append_message(session_id, MessageRole::Assistant, &reply)
            .await
    }

    async fn owned_session(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<ChatSession, ChatError> {
        self.store
            .get_session(user_id, session_id)
            .await?
            .ok_or(ChatError::NotFound(*session_id))
    }
}
