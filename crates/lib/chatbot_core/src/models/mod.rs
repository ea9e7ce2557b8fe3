//! Domain models shared by the auth and chat modules.

pub mod auth;
pub mod chat;
