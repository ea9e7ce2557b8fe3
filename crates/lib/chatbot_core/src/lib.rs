//! # chatbot_core
//!
//! Core domain logic for the chatbot backend: session tokens, credentials,
//! conversation persistence and reply generation.

pub mod auth;
pub mod chat;
pub mod clock;
pub mod config;
pub mod conversations;
pub mod memory;
pub mod migrate;
pub mod models;
pub mod reply;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
