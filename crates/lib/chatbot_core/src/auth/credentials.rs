//! Registration and username/password authentication.

use std::sync::Arc;

use tracing::info;

use super::AuthError;
use super::password::PasswordHasher;
use super::users::UserStore;
use crate::models::auth::User;

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_USERNAME_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 100;
/// bcrypt ignores input past 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Verifies credentials and creates accounts.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    /// Create a new account. Email uniqueness is checked before username.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        validate_registration(email, username, password)?;

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self.users.create(email, username, &password_hash).await?;
        info!(user_id = %user.id, username, "registered user");
        Ok(user)
    }

    /// Check a username/password pair.
    ///
    /// Unknown usernames and wrong passwords both yield `InvalidCredentials`.
    /// A correct password on a deactivated account yields `UnknownOrInactiveUser`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::UnknownOrInactiveUser);
        }
        Ok(user)
    }
}

fn validate_registration(email: &str, username: &str, password: &str) -> Result<(), AuthError> {
    if email.len() > MAX_EMAIL_LEN || !is_plausible_email(email) {
        return Err(AuthError::Validation("Invalid email address".into()));
    }
    let username_len = username.chars().count();
    if username.trim().is_empty() || username_len > MAX_USERNAME_LEN {
        return Err(AuthError::Validation(format!(
            "Username must be 1 to {MAX_USERNAME_LEN} characters"
        )));
    }
    let password_len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
        return Err(AuthError::Validation(format!(
            "Password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
