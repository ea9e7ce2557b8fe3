//! Session-token configuration and environment helpers.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use thiserror::Error;

use crate::auth::jwt::resolve_jwt_secret;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("Unsupported JWT algorithm: {0} (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),
}

/// Read `key` from the environment, falling back to `default` when unset or empty.
///
/// A set but unparseable value is an error rather than a silent default.
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            })
        }
        _ => Ok(default),
    }
}

/// Parse a JWT algorithm name, accepting only the HMAC family.
pub fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    match Algorithm::from_str(name) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(ConfigError::UnsupportedAlgorithm(name.to_string())),
    }
}

/// Token signing and session-window settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC signing secret.
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub access_token_ttl: Duration,
    /// Sliding window: a session dies if not refreshed within this long.
    pub inactivity_timeout: Duration,
    /// Absolute cap measured from the first login.
    pub max_session_duration: Duration,
}

impl AuthConfig {
    /// Default access token lifetime: 4 hours.
    pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 240;
    /// Default inactivity timeout: 24 hours.
    pub const DEFAULT_INACTIVITY_MINUTES: i64 = 1440;
    /// Default maximum session duration: 30 days.
    pub const DEFAULT_MAX_SESSION_MINUTES: i64 = 43_200;

    /// Defaults for everything but the secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            jwt_algorithm: Algorithm::HS256,
            access_token_ttl: Duration::minutes(Self::DEFAULT_ACCESS_TOKEN_MINUTES),
            inactivity_timeout: Duration::minutes(Self::DEFAULT_INACTIVITY_MINUTES),
            max_session_duration: Duration::minutes(Self::DEFAULT_MAX_SESSION_MINUTES),
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                                  | Default                   |
    /// |-------------------------------------------|---------------------------|
    /// | `JWT_SECRET_KEY`                          | generated & persisted     |
    /// | `JWT_ALGORITHM`                           | `HS256`                   |
    /// | `JWT_ACCESS_TOKEN_EXPIRE_MINUTES`         | `240`                     |
    /// | `JWT_REFRESH_INACTIVITY_TIMEOUT_MINUTES`  | `1440`                    |
    /// | `JWT_MAX_SESSION_DURATION_MINUTES`        | `43200`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let algorithm: String = env_or("JWT_ALGORITHM", "HS256".to_string())?;
        Ok(Self {
            jwt_secret: resolve_jwt_secret(),
            jwt_algorithm: parse_hmac_algorithm(&algorithm)?,
            access_token_ttl: positive_minutes(
                "JWT_ACCESS_TOKEN_EXPIRE_MINUTES",
                Self::DEFAULT_ACCESS_TOKEN_MINUTES,
            )?,
            inactivity_timeout: positive_minutes(
                "JWT_REFRESH_INACTIVITY_TIMEOUT_MINUTES",
                Self::DEFAULT_INACTIVITY_MINUTES,
            )?,
            max_session_duration: positive_minutes(
                "JWT_MAX_SESSION_DURATION_MINUTES",
                Self::DEFAULT_MAX_SESSION_MINUTES,
            )?,
        })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("inactivity_timeout", &self.inactivity_timeout)
            .field("max_session_duration", &self.max_session_duration)
            .finish()
    }
}

/// Upper bound for any configured window: ten years.
pub const MAX_WINDOW_MINUTES: i64 = 10 * 365 * 24 * 60;

fn positive_minutes(key: &str, default: i64) -> Result<Duration, ConfigError> {
    let minutes: i64 = env_or(key, default)?;
    bounded_minutes(key, minutes)
}

/// `1..=MAX_WINDOW_MINUTES` minutes as a `Duration`.
fn bounded_minutes(key: &str, minutes: i64) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: key.to_string(),
        value: minutes.to_string(),
    };
    if !(1..=MAX_WINDOW_MINUTES).contains(&minutes) {
        return Err(invalid());
    }
    Duration::try_minutes(minutes).ok_or_else(invalid)
}
