//! Session-window policy.
//!
//! Two independent limits apply to every non-legacy token:
//!
//! - **absolute cap**: `now - session_started_at <= max_session_duration`
//! - **sliding window**: `now - last_refresh_at <= inactivity_timeout`
//!
//! Both bounds are inclusive. When both are violated the absolute cap is
//! reported.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::models::auth::TokenClaims;

/// Why a session is no longer valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionViolation {
    #[error("max duration exceeded")]
    MaxDurationExceeded,

    #[error("inactivity timeout")]
    InactivityTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub inactivity_timeout: Duration,
    pub max_session_duration: Duration,
}

impl SessionPolicy {
    pub fn new(inactivity_timeout: Duration, max_session_duration: Duration) -> Self {
        Self {
            inactivity_timeout,
            max_session_duration,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.inactivity_timeout, config.max_session_duration)
    }

    /// Check the session windows embedded in `claims`.
    ///
    /// Tokens lacking either session timestamp are legacy and always pass.
    pub fn validate(&self, claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), SessionViolation> {
        let (Some(started_at), Some(last_refresh_at)) =
            (claims.session_started_at, claims.last_refresh_at)
        else {
            return Ok(());
        };
        let now = now.timestamp();

        if now - started_at > self.max_session_duration.num_seconds() {
            return Err(SessionViolation::MaxDurationExceeded);
        }
        if now - last_refresh_at > self.inactivity_timeout.num_seconds() {
            return Err(SessionViolation::InactivityTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::TokenKind;

    const T0: i64 = 1_700_000_000;

    fn policy() -> SessionPolicy {
        SessionPolicy::new(Duration::seconds(300), Duration::seconds(1200))
    }

    fn at(offset: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(T0 + offset, 0).unwrap()
    }

    fn claims(started: Option<i64>, last_refresh: Option<i64>) -> TokenClaims {
        TokenClaims {
            sub: "user".to_string(),
            kind: TokenKind::Refresh,
            exp: T0 + 10_000,
            iat: Some(T0),
            session_started_at: started.map(|s| T0 + s),
            last_refresh_at: last_refresh.map(|s| T0 + s),
        }
    }

    #[test]
    fn fresh_session_is_valid() {
        assert_eq!(policy().validate(&claims(Some(0), Some(0)), at(0)), Ok(()));
    }

    #[test]
    fn inactivity_boundary_is_inclusive() {
        let c = claims(Some(0), Some(0));
        assert_eq!(policy().validate(&c, at(300)), Ok(()));
        assert_eq!(
            policy().validate(&c, at(301)),
            Err(SessionViolation::InactivityTimeout)
        );
    }

    #[test]
    fn max_duration_applies_even_after_recent_refresh() {
        let c = claims(Some(0), Some(1190));
        assert_eq!(policy().validate(&c, at(1200)), Ok(()));
        assert_eq!(
            policy().validate(&c, at(1201)),
            Err(SessionViolation::MaxDurationExceeded)
        );
    }

    #[test]
    fn max_duration_is_reported_when_both_windows_fail() {
        let c = claims(Some(0), Some(0));
        assert_eq!(
            policy().validate(&c, at(5000)),
            Err(SessionViolation::MaxDurationExceeded)
        );
    }

    #[test]
    fn legacy_tokens_are_exempt() {
        assert_eq!(policy().validate(&claims(None, None), at(99_999)), Ok(()));
        assert_eq!(policy().validate(&claims(Some(0), None), at(99_999)), Ok(()));
        assert_eq!(policy().validate(&claims(None, Some(0)), at(99_999)), Ok(()));
    }

    #[test]
    fn violation_reasons_read_plainly() {
        assert_eq!(
            SessionViolation::MaxDurationExceeded.to_string(),
            "max duration exceeded"
        );
        assert_eq!(
            SessionViolation::InactivityTimeout.to_string(),
            "inactivity timeout"
        );
    }
}
