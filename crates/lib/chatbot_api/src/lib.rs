//! # chatbot_api
//!
//! HTTP API library for the chatbot backend.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use chatbot_core::auth::credentials::CredentialStore;
use chatbot_core::auth::issuer::SessionIssuer;
use chatbot_core::auth::password::BcryptHasher;
use chatbot_core::auth::users::{PgUserStore, UserStore};
use chatbot_core::chat::ChatService;
use chatbot_core::clock::{Clock, SystemClock};
use chatbot_core::conversations::{ConversationStore, PgConversationStore};
use chatbot_core::reply::ReplyGenerator;
use chatbot_core::reply::ollama::OllamaReplyGenerator;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::InitError;
use crate::handlers::{auth, chat, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub users: Arc<dyn UserStore>,
    pub credentials: CredentialStore,
    pub sessions: Arc<SessionIssuer>,
    pub chat: ChatService,
}

impl AppState {
    /// Wire the services over the given collaborators.
    pub fn new(
        config: ApiConfig,
        users: Arc<dyn UserStore>,
        conversations: Arc<dyn ConversationStore>,
        generator: Arc<dyn ReplyGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, InitError> {
        let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));
        let sessions = SessionIssuer::new(&config.auth, users.clone(), clock)?;
        Ok(Self {
            credentials: CredentialStore::new(users.clone(), hasher),
            sessions: Arc::new(sessions),
            chat: ChatService::new(conversations, generator),
            users,
            config,
        })
    }

    /// Production wiring: Postgres stores, Ollama replies, system clock.
    pub fn postgres(config: ApiConfig, pool: PgPool) -> Result<Self, InitError> {
        let generator = OllamaReplyGenerator::new(config.ollama.clone())?;
        Self::new(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgConversationStore::new(pool)),
            Arc::new(generator),
            Arc::new(SystemClock),
        )
    }
}

/// Run embedded database migrations.
///
/// Delegates to `chatbot_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    chatbot_core::migrate::migrate(pool).await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(
            routes::CHAT_SESSIONS,
            get(chat::list_sessions_handler).post(chat::create_session_handler),
        )
        .route(
            routes::CHAT_SESSIONS_ID,
            get(chat::get_session_handler).delete(chat::delete_session_handler),
        )
        .route(
            routes::POST_CHAT_SESSIONS_ID_MESSAGES,
            post(chat::send_message_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
