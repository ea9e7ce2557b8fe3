//! Postgres-backed store tests.
//!
//! Each test connects to `DATABASE_URL`, applies the migrations and works on
//! freshly created rows. Without `DATABASE_URL` the tests return early.

use chatbot_core::auth::AuthError;
use chatbot_core::auth::users::{PgUserStore, UserStore};
use chatbot_core::conversations::{ChatError, ConversationStore, PgConversationStore};
use chatbot_core::models::auth::User;
use chatbot_core::models::chat::MessageRole;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres store test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap();
    chatbot_core::migrate::migrate(&pool).await.unwrap();
    Some(pool)
}

async fn new_user(users: &PgUserStore) -> User {
    let tag = Uuid::now_v7().simple().to_string();
    users
        .create(&format!("{tag}@example.com"), &format!("user-{tag}"), "hash")
        .await
        .unwrap()
}

#[tokio::test]
async fn append_bumps_session_updated_at_to_message_time() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool.clone());
    let store = PgConversationStore::new(pool);
    let user = new_user(&users).await;

    let session = store.create_session(&user.id, "first").await.unwrap();
    assert_eq!(session.created_at, session.updated_at);

    let message = store
        .append_message(&session.id, MessageRole::User, "hello")
        .await
        .unwrap();
    let reloaded = store
        .get_session(&user.id, &session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.updated_at, message.created_at);
    assert!(reloaded.updated_at >= session.updated_at);
    assert_eq!(reloaded.created_at, session.created_at);
}

#[tokio::test]
async fn messages_replay_in_insertion_order() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool.clone());
    let store = PgConversationStore::new(pool);
    let user = new_user(&users).await;
    let session = store.create_session(&user.id, "log").await.unwrap();

    let turns = [
        (MessageRole::User, "one"),
        (MessageRole::Assistant, "two"),
        (MessageRole::User, "three"),
        (MessageRole::Assistant, "four"),
    ];
    for (role, content) in turns {
        store
            .append_message(&session.id, role, content)
            .await
            .unwrap();
    }

    let history = store.messages(&session.id).await.unwrap();
    let replayed: Vec<(MessageRole, &str)> = history
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(replayed, turns);
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn most_recently_active_session_lists_first() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool.clone());
    let store = PgConversationStore::new(pool);
    let user = new_user(&users).await;

    let older = store.create_session(&user.id, "older").await.unwrap();
    let newer = store.create_session(&user.id, "newer").await.unwrap();
    let ids: Vec<Uuid> = store
        .list_sessions(&user.id)
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, [newer.id, older.id]);

    store
        .append_message(&older.id, MessageRole::User, "back again")
        .await
        .unwrap();
    let ids: Vec<Uuid> = store
        .list_sessions(&user.id)
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, [older.id, newer.id]);
}

#[tokio::test]
async fn delete_session_cascades_to_messages() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool.clone());
    let store = PgConversationStore::new(pool.clone());
    let user = new_user(&users).await;
    let session = store.create_session(&user.id, "doomed").await.unwrap();
    store
        .append_message(&session.id, MessageRole::User, "hi")
        .await
        .unwrap();
    store
        .append_message(&session.id, MessageRole::Assistant, "hello")
        .await
        .unwrap();

    assert!(store.delete_session(&user.id, &session.id).await.unwrap());
    assert!(!store.delete_session(&user.id, &session.id).await.unwrap());

    let (remaining,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_session_id = $1")
            .bind(session.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
    assert!(store.messages(&session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_user_removes_their_sessions() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool.clone());
    let store = PgConversationStore::new(pool.clone());
    let user = new_user(&users).await;
    let session = store.create_session(&user.id, "orphan").await.unwrap();
    store
        .append_message(&session.id, MessageRole::User, "hi")
        .await
        .unwrap();

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(store.list_sessions(&user.id).await.unwrap().is_empty());
    assert!(store.messages(&session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn sessions_are_scoped_to_their_owner() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool.clone());
    let store = PgConversationStore::new(pool);
    let owner = new_user(&users).await;
    let other = new_user(&users).await;
    let session = store.create_session(&owner.id, "private").await.unwrap();

    assert!(
        store
            .get_session(&other.id, &session.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(store.list_sessions(&other.id).await.unwrap().is_empty());
    assert!(!store.delete_session(&other.id, &session.id).await.unwrap());
    assert!(
        store
            .get_session(&owner.id, &session.id)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn append_to_missing_session_is_not_found() {
    let Some(pool) = pool().await else { return };
    let store = PgConversationStore::new(pool);
    let missing = Uuid::now_v7();

    let err = store
        .append_message(&missing, MessageRole::User, "anyone there?")
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotFound(id) if id == missing));
}

#[tokio::test]
async fn unique_violations_map_to_duplicate_errors() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool);
    let existing = new_user(&users).await;
    let tag = Uuid::now_v7().simple().to_string();

    // Straight to the insert, as when two registrations race past the lookups.
    let err = users
        .create(&existing.email, &format!("user-{tag}"), "hash")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail), "{err}");

    let err = users
        .create(&format!("{tag}@example.com"), &existing.username, "hash")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateUsername), "{err}");

    let found = users
        .find_by_username(&existing.username)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, existing.id);
    assert!(found.is_active);
    assert_eq!(
        users.find_by_email(&existing.email).await.unwrap().map(|u| u.id),
        Some(existing.id)
    );
}
