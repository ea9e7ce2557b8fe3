//! Reply generation: turns an ordered message history into assistant text.
//!
//! # Providers
//!
//! - [`ollama::OllamaReplyGenerator`]: Ollama `/api/chat`, non-streaming.

pub mod ollama;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::chat::Message;

/// Errors that can occur while generating a reply.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    Decode(String),
}

/// Produces the next assistant message for a conversation.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// `history` is oldest first and ends with the user's latest message.
    async fn generate(&self, history: &[Message]) -> Result<String, ReplyError>;
}
