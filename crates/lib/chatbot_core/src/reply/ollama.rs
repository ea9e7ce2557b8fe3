//! Ollama reply provider.
//!
//! Calls the Ollama API (`/api/chat`) with the full conversation, prefixed
//! by a fixed system prompt, and returns the assistant's message content.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ReplyError, ReplyGenerator};
use crate::config::{ConfigError, env_or};
use crate::models::chat::{Message, MessageRole};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Be concise, accurate, and friendly. \
     If you don't know something, say so honestly.";

/// Connection and sampling settings for Ollama.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// API base URL, without a trailing `/api`.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Upper bound on one generation request.
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    /// Reads `OLLAMA_BASE_URL`, `OLLAMA_MODEL` and `OLLAMA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs: u64 = env_or("OLLAMA_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        Ok(Self {
            base_url: env_or("OLLAMA_BASE_URL", defaults.base_url)?,
            model: env_or("OLLAMA_MODEL", defaults.model)?,
            temperature: defaults.temperature,
            timeout: timeout_from_secs(timeout_secs)?,
        })
    }
}

/// A zero timeout would fail every request immediately.
fn timeout_from_secs(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key: "OLLAMA_TIMEOUT_SECS".into(),
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, PartialEq, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Ollama's chat role names.
fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

fn wire_messages<'a>(system_prompt: &'a str, history: &'a [Message]) -> Vec<WireMessage<'a>> {
    std::iter::once(WireMessage {
        role: "system",
        content: system_prompt,
    })
    .chain(history.iter().map(|m| WireMessage {
        role: wire_role(m.role),
        content: &m.content,
    }))
    .collect()
}

pub struct OllamaReplyGenerator {
    client: Client,
    config: OllamaConfig,
    system_prompt: String,
}

impl OllamaReplyGenerator {
    pub fn new(config: OllamaConfig) -> Result<Self, ReplyError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl ReplyGenerator for OllamaReplyGenerator {
    async fn generate(&self, history: &[Message]) -> Result<String, ReplyError> {
        let url = format!("{}/api/chat", self.config.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.config.model,
                messages: wire_messages(&self.system_prompt, history),
                stream: false,
                options: ChatOptions {
                    temperature: self.config.temperature,
                },
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ReplyError::Status { status, body });
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ReplyError::Decode(e.to_string()))?;

        data.message
            .map(|m| m.content)
            .ok_or_else(|| ReplyError::Decode("response has no message".to_string()))
    }
}
