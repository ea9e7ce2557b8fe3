//! Route paths.

pub const GET_HEALTH: &str = "/health";

pub const POST_AUTH_REGISTER: &str = "/api/v1/auth/register";
pub const POST_AUTH_LOGIN: &str = "/api/v1/auth/login";
pub const POST_AUTH_REFRESH: &str = "/api/v1/auth/refresh";
pub const GET_AUTH_ME: &str = "/api/v1/auth/me";

pub const CHAT_SESSIONS: &str = "/api/v1/chat/sessions";
pub const CHAT_SESSIONS_ID: &str = "/api/v1/chat/sessions/{id}";
pub const POST_CHAT_SESSIONS_ID_MESSAGES: &str = "/api/v1/chat/sessions/{id}/messages";
