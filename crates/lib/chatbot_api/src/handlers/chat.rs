//! Chat session and message handlers. All routes are scoped to the caller.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ChatSessionCreate, ChatSessionRead, ChatSessionWithMessages, MessageCreate, MessageRead,
};

/// `GET /api/v1/chat/sessions`: most recently active first.
pub async fn list_sessions_handler(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedUser(user)): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<ChatSessionRead>>> {
    let sessions = state.chat.list_sessions(&user.id).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// `POST /api/v1/chat/sessions`
pub async fn create_session_handler(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedUser(user)): axum::Extension<AuthenticatedUser>,
    Json(body): Json<ChatSessionCreate>,
) -> AppResult<(StatusCode, Json<ChatSessionRead>)> {
    let session = state
        .chat
        .create_session(&user.id, body.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// `GET /api/v1/chat/sessions/{id}`: session with its messages.
pub async fn get_session_handler(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedUser(user)): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ChatSessionWithMessages>> {
    let (session, messages) = state.chat.get_session_with_messages(&user.id, &id).await?;
    Ok(Json(ChatSessionWithMessages {
        session: session.into(),
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}

/// `DELETE /api/v1/chat/sessions/{id}`
pub async fn delete_session_handler(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedUser(user)): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.chat.delete_session(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/chat/sessions/{id}/messages`: returns the assistant reply.
pub async fn send_message_handler(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedUser(user)): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageCreate>,
) -> AppResult<Json<MessageRead>> {
    let reply = state
        .chat
        .send_message(&user.id, &id, &body.content)
        .await?;
    Ok(Json(reply.into()))
}
