//! In-process stores for tests and embedding without a database.
//!
//! Each store keeps its rows behind one mutex, so every operation
//! (including message append + session bump) is atomic.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::auth::users::UserStore;
use crate::clock::Clock;
use crate::conversations::{ChatError, ConversationStore};
use crate::models::auth::User;
use crate::models::chat::{ChatSession, Message, MessageRole};
use crate::uuid::uuidv7;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    clock: Arc<dyn Clock>,
}

impl MemoryUserStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            clock,
        }
    }

    /// Flip the active flag. Returns false if the user does not exist.
    pub fn set_active(&self, id: &Uuid, active: bool) -> bool {
        let now = self.clock.now();
        let mut users = lock(&self.users);
        match users.iter_mut().find(|u| u.id == *id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = now;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.users).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        lock(&self.users).iter().find(|u| pred(u)).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.find(|u| u.id == *id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find(|u| u.username == username))
    }

    async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        let now = self.clock.now();
        let mut users = lock(&self.users);
        if users.iter().any(|u| u.email == email) {
            return Err(AuthError::DuplicateEmail);
        }
        if users.iter().any(|u| u.username == username) {
            return Err(AuthError::DuplicateUsername);
        }
        let user = User {
            id: uuidv7(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
struct Conversations {
    sessions: Vec<ChatSession>,
    /// Insertion order is creation order.
    messages: Vec<Message>,
}

pub struct MemoryConversationStore {
    inner: Mutex<Conversations>,
    clock: Arc<dyn Clock>,
}

impl MemoryConversationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Conversations::default()),
            clock,
        }
    }

    /// Total messages across all sessions.
    pub fn message_count(&self) -> usize {
        lock(&self.inner).messages.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<ChatSession>, ChatError> {
        let inner = lock(&self.inner);
        let mut sessions: Vec<ChatSession> = inner
            .sessions
            .iter()
            .filter(|s| s.user_id == *user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn create_session(&self, user_id: &Uuid, title: &str) -> Result<ChatSession, ChatError> {
        let now = self.clock.now();
        let session = ChatSession {
            id: uuidv7(),
            user_id: *user_id,
            title: Some(title.to_string()),
            created_at: now,
            updated_at: now,
        };
        lock(&self.inner).sessions.push(session.clone());
        Ok(session)
    }

    async fn get_session(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<Option<ChatSession>, ChatError> {
        Ok(lock(&self.inner)
            .sessions
            .iter()
            .find(|s| s.id == *session_id && s.user_id == *user_id)
            .cloned())
    }

    async fn delete_session(&self, user_id: &Uuid, session_id: &Uuid) -> Result<bool, ChatError> {
        let mut inner = lock(&self.inner);
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|s| !(s.id == *session_id && s.user_id == *user_id));
        let deleted = inner.sessions.len() < before;
        if deleted {
            inner.messages.retain(|m| m.chat_session_id != *session_id);
        }
        Ok(deleted)
    }

    async fn append_message(
        &self,
        session_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, ChatError> {
        let now = self.clock.now();
        let mut inner = lock(&self.inner);
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == *session_id)
            .ok_or(ChatError::NotFound(*session_id))?;
        session.updated_at = now;

        let message = Message {
            id: uuidv7(),
            chat_session_id: *session_id,
            role,
            content: content.to_string(),
            created_at: now,
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn messages(&self, session_id: &Uuid) -> Result<Vec<Message>, ChatError> {
        Ok(lock(&self.inner)
            .messages
            .iter()
            .filter(|m| m.chat_session_id == *session_id)
            .cloned()
            .collect())
    }
}
