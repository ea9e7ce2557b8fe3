//! Session issuer: mints and refreshes access/refresh token pairs.
//!
//! A session is born at login with `session_started_at = last_refresh_at = now`.
//! Every refresh keeps `session_started_at` and moves `last_refresh_at` to the
//! refresh time. The refresh token itself expires exactly at the inactivity
//! boundary, so an unused one also fails decoding once the window closes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::jwt::TokenCodec;
use super::session::SessionPolicy;
use super::users::UserStore;
use crate::clock::Clock;
use crate::config::{AuthConfig, ConfigError};
use crate::models::auth::{TokenClaims, TokenKind, TokenPair, User};

pub struct SessionIssuer {
    codec: TokenCodec,
    policy: SessionPolicy,
    access_token_ttl: Duration,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl SessionIssuer {
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            codec: TokenCodec::new(config.jwt_secret.as_bytes(), config.jwt_algorithm)?,
            policy: SessionPolicy::from_config(config),
            access_token_ttl: config.access_token_ttl,
            users,
            clock,
        })
    }

    /// Start a new session for `user`.
    pub fn issue_new_session(&self, user: &User) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        self.issue(&user.id, now.timestamp(), now)
    }

    /// Exchange a refresh token for a new pair in the same session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let claims = self.codec.decode(refresh_token, now)?;

        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::WrongTokenType);
        }

        if let Err(reason) = self.policy.validate(&claims, now) {
            debug!(sub = %claims.sub, %reason, "refresh rejected");
            return Err(AuthError::SessionExpired(reason));
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::UnknownOrInactiveUser)?;
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::UnknownOrInactiveUser)?;

        // A legacy token carries no start time; its session starts now.
        let session_started_at = claims.session_started_at.unwrap_or(now.timestamp());
        self.issue(&user.id, session_started_at, now)
    }

    /// Verify a bearer token for an API call.
    pub fn authenticate_access(&self, access_token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.decode(access_token, self.clock.now())?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }

    fn issue(
        &self,
        user_id: &Uuid,
        session_started_at: i64,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let claims = |kind: TokenKind, ttl: Duration| -> Result<TokenClaims, AuthError> {
            let exp = now
                .checked_add_signed(ttl)
                .ok_or_else(|| AuthError::Internal(format!("token lifetime overflows: {ttl}")))?;
            Ok(TokenClaims {
                sub: user_id.to_string(),
                kind,
                exp: exp.timestamp(),
                iat: Some(now.timestamp()),
                session_started_at: Some(session_started_at),
                last_refresh_at: Some(now.timestamp()),
            })
        };

        let access_token = self
            .codec
            .encode(&claims(TokenKind::Access, self.access_token_ttl)?)?;
        let refresh_token = self
            .codec
            .encode(&claims(TokenKind::Refresh, self.policy.inactivity_timeout)?)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in: self.access_token_ttl.num_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryUserStore;

    const SECRET: &str = "issuer-test-secret";
    const T0: i64 = 1_700_000_000;

    struct Harness {
        issuer: SessionIssuer,
        clock: Arc<ManualClock>,
        users: Arc<MemoryUserStore>,
        user: User,
    }

    impl Harness {
        async fn new() -> Self {
            let clock = Arc::new(ManualClock::new(at(0)));
            let users = Arc::new(MemoryUserStore::new(clock.clone()));
            let user = users
                .create("a@b.com", "alice", "not-a-real-hash")
                .await
                .unwrap();

            let config = AuthConfig {
                access_token_ttl: Duration::seconds(60),
                inactivity_timeout: Duration::seconds(300),
                max_session_duration: Duration::seconds(1200),
                ..AuthConfig::with_secret(SECRET)
            };
            let issuer = SessionIssuer::new(&config, users.clone(), clock.clone()).unwrap();
            Self {
                issuer,
                clock,
                users,
                user,
            }
        }

        fn at(&self, offset: i64) {
            self.clock.set(at(offset));
        }

        fn claims(&self, token: &str) -> TokenClaims {
            self.issuer.codec.decode(token, self.clock.now()).unwrap()
        }
    }

    fn at(offset: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(T0 + offset, 0).unwrap()
    }

    #[tokio::test]
    async fn new_session_sets_both_timestamps_to_now() {
        let h = Harness::new().await;
        let pair = h.issuer.issue_new_session(&h.user).unwrap();
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 60);

        let access = h.claims(&pair.access_token);
        let refresh = h.claims(&pair.refresh_token);
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        for c in [&access, &refresh] {
            assert_eq!(c.sub, h.user.id.to_string());
            assert_eq!(c.session_started_at, Some(T0));
            assert_eq!(c.last_refresh_at, Some(T0));
        }
        assert_eq!(access.exp, T0 + 60);
        assert_eq!(refresh.exp, T0 + 300);
    }

    #[tokio::test]
    async fn sliding_window_then_absolute_cap() {
        let h = Harness::new().await;
        let first = h.issuer.issue_new_session(&h.user).unwrap();

        h.at(290);
        let second = h.issuer.refresh_session(&first.refresh_token).await.unwrap();

        h.at(580);
        let third = h.issuer.refresh_session(&second.refresh_token).await.unwrap();

        h.at(870);
        let fourth = h.issuer.refresh_session(&third.refresh_token).await.unwrap();

        h.at(1160);
        let fifth = h.issuer.refresh_session(&fourth.refresh_token).await.unwrap();
        assert_eq!(h.claims(&fifth.refresh_token).last_refresh_at, Some(T0 + 1160));

        // Only 90s since the last refresh, but 1250s since login.
        h.at(1250);
        let err = h
            .issuer
            .refresh_session(&fifth.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::SessionExpired(crate::auth::session::SessionViolation::MaxDurationExceeded)
        ));
    }

    #[tokio::test]
    async fn refresh_chain_preserves_session_start() {
        let h = Harness::new().await;
        let mut pair = h.issuer.issue_new_session(&h.user).unwrap();

        for step in 1..=4 {
            h.at(step * 100);
            pair = h.issuer.refresh_session(&pair.refresh_token).await.unwrap();
            let refresh = h.claims(&pair.refresh_token);
            let access = h.claims(&pair.access_token);
            assert_eq!(refresh.session_started_at, Some(T0));
            assert_eq!(access.session_started_at, Some(T0));
            assert_eq!(refresh.last_refresh_at, Some(T0 + step * 100));
            assert_eq!(refresh.exp, T0 + step * 100 + 300);
        }
    }

    #[tokio::test]
    async fn refresh_succeeds_exactly_at_inactivity_boundary() {
        let h = Harness::new().await;
        let pair = h.issuer.issue_new_session(&h.user).unwrap();

        h.at(300);
        assert!(h.issuer.refresh_session(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_after_inactivity_fails() {
        let h = Harness::new().await;
        let pair = h.issuer.issue_new_session(&h.user).unwrap();

        // The refresh token's own expiry coincides with the inactivity window.
        h.at(301);
        let err = h
            .issuer
            .refresh_session(&pair.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let h = Harness::new().await;
        let pair = h.issuer.issue_new_session(&h.user).unwrap();

        let err = h
            .issuer
            .refresh_session(&pair.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenType));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let h = Harness::new().await;
        let pair = h.issuer.issue_new_session(&h.user).unwrap();

        assert!(h.issuer.authenticate_access(&pair.access_token).is_ok());
        assert!(matches!(
            h.issuer.authenticate_access(&pair.refresh_token),
            Err(AuthError::WrongTokenType)
        ));
    }

    #[tokio::test]
    async fn inactive_user_cannot_refresh() {
        let h = Harness::new().await;
        let pair = h.issuer.issue_new_session(&h.user).unwrap();
        h.users.set_active(&h.user.id, false);

        h.at(10);
        let err = h
            .issuer
            .refresh_session(&pair.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownOrInactiveUser));
    }

    #[tokio::test]
    async fn unknown_subject_cannot_refresh() {
        let h = Harness::new().await;
        let ghost = User {
            id: Uuid::now_v7(),
            ..h.user.clone()
        };
        let pair = h.issuer.issue_new_session(&ghost).unwrap();

        let err = h
            .issuer
            .refresh_session(&pair.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownOrInactiveUser));
    }

    #[tokio::test]
    async fn legacy_refresh_token_starts_a_session_on_refresh() {
        let h = Harness::new().await;
        let legacy = TokenClaims {
            sub: h.user.id.to_string(),
            kind: TokenKind::Refresh,
            exp: T0 + 10_000,
            iat: None,
            session_started_at: None,
            last_refresh_at: None,
        };
        let token = h.issuer.codec.encode(&legacy).unwrap();

        // Far beyond both windows; the legacy exemption still lets it through.
        h.at(5_000);
        let pair = h.issuer.refresh_session(&token).await.unwrap();
        let refreshed = h.claims(&pair.refresh_token);
        assert_eq!(refreshed.session_started_at, Some(T0 + 5_000));
        assert_eq!(refreshed.last_refresh_at, Some(T0 + 5_000));
    }

    #[tokio::test]
    async fn token_from_other_secret_cannot_refresh() {
        let h = Harness::new().await;
        let foreign = TokenCodec::new(b"some-other-secret", jsonwebtoken::Algorithm::HS256)
            .unwrap()
            .encode(&TokenClaims {
                sub: h.user.id.to_string(),
                kind: TokenKind::Refresh,
                exp: T0 + 300,
                iat: Some(T0),
                session_started_at: Some(T0),
                last_refresh_at: Some(T0),
            })
            .unwrap();

        let err = h.issuer.refresh_session(&foreign).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn overflowing_lifetime_is_an_error_not_a_panic() {
        let h = Harness::new().await;
        let config = AuthConfig {
            inactivity_timeout: Duration::days(365 * 1_000_000),
            ..AuthConfig::with_secret(SECRET)
        };
        let issuer = SessionIssuer::new(&config, h.users.clone(), h.clock.clone()).unwrap();

        assert!(matches!(
            issuer.issue_new_session(&h.user),
            Err(AuthError::Internal(_))
        ));
    }
}
