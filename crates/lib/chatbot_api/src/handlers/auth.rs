//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chatbot_core::auth::AuthError;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse, UserRead};

/// `POST /api/v1/auth/register`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserRead>)> {
    let user = state
        .credentials
        .register(&body.email, &body.username, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /api/v1/auth/login`: start a session with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = state
        .credentials
        .authenticate(&body.username, &body.password)
        .await
        .map_err(|e| match e {
            AuthError::UnknownOrInactiveUser => AppError::Unauthorized("Inactive user".into()),
            other => other.into(),
        })?;
    let pair = state.sessions.issue_new_session(&user)?;
    info!(user_id = %user.id, "login");
    Ok(Json(pair.into()))
}

/// `POST /api/v1/auth/refresh`: exchange a refresh token for a new pair.
///
/// Every token or session failure gets the same 401 body.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state
        .sessions
        .refresh_session(&body.refresh_token)
        .await
        .map_err(|e| match e {
            AuthError::Db(_) | AuthError::Internal(_) => AppError::from(e),
            _ => AppError::Unauthorized("Invalid refresh token or session expired".into()),
        })?;
    Ok(Json(pair.into()))
}

/// `GET /api/v1/auth/me`: the authenticated user.
pub async fn me_handler(
    axum::Extension(AuthenticatedUser(user)): axum::Extension<AuthenticatedUser>,
) -> Json<UserRead> {
    Json(user.into())
}
