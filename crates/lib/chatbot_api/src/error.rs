//! Application error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use chatbot_core::auth::AuthError;
use chatbot_core::config::ConfigError;
use chatbot_core::conversations::ChatError;
use chatbot_core::reply::ReplyError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Rendered with `WWW-Authenticate: Bearer`.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: message.to_string(),
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Incorrect username or password".into())
            }
            AuthError::InvalidToken
            | AuthError::WrongTokenType
            | AuthError::SessionExpired(_)
            | AuthError::UnknownOrInactiveUser => {
                AppError::Unauthorized("Could not validate credentials".into())
            }
            AuthError::DuplicateEmail | AuthError::DuplicateUsername => {
                AppError::Validation(e.to_string())
            }
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Db(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotFound(_) => AppError::NotFound("Chat session not found".into()),
            ChatError::Validation(msg) => AppError::Validation(msg),
            ChatError::Db(e) => AppError::from(e),
        }
    }
}

/// Failure to assemble [`crate::AppState`].
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Reply generator: {0}")]
    Reply(#[from] ReplyError),
}

#[cfg(test)]
mod tests {
    use chatbot_core::auth::session::SessionViolation;

    use super::*;

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let resp = AppError::from(AuthError::InvalidToken).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn session_violation_is_unauthorized() {
        let resp = AppError::from(AuthError::SessionExpired(
            SessionViolation::InactivityTimeout,
        ))
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn duplicates_are_bad_requests() {
        for e in [AuthError::DuplicateEmail, AuthError::DuplicateUsername] {
            let resp = AppError::from(e).into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert!(resp.headers().get(WWW_AUTHENTICATE).is_none());
        }
    }

    #[test]
    fn chat_errors_map_to_status() {
        let missing = AppError::from(ChatError::NotFound(uuid::Uuid::nil())).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let db = AppError::from(ChatError::Db(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
