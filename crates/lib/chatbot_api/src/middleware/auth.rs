//! Authentication middleware: Bearer token extraction and user lookup.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chatbot_core::models::auth::User;
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// The caller, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

fn credentials_rejected() -> AppError {
    AppError::Unauthorized("Could not validate credentials".into())
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies it as an
/// access token, loads the user and injects `AuthenticatedUser`.
///
/// Unknown users are 401; inactive users are 403.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = state.sessions.authenticate_access(token.trim()).map_err(|e| {
        debug!(error = %e, "access token rejected");
        credentials_rejected()
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| credentials_rejected())?;
    let user = state
        .users
        .find_by_id(&user_id)
        .await?
        .ok_or_else(credentials_rejected)?;

    if !user.is_active {
        return Err(AppError::Forbidden("Inactive user".into()));
    }

    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}
