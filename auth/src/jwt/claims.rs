use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Purpose of a signed token.
///
/// Access tokens authorize individual requests; refresh tokens are only
/// accepted when minting a new token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Claims carried inside every issued token.
///
/// Timestamps are encoded with microsecond precision so that callers can
/// compare `issued_at` against per-subject watermarks without rounding to
/// whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Unique token identifier, fresh for every issuance
    pub jti: Uuid,

    /// Subject (identity the token was issued to)
    pub sub: Uuid,

    /// Version of the subject's credentials the token was issued against
    pub session: i64,

    pub kind: TokenKind,

    #[serde(with = "chrono::serde::ts_microseconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_microseconds")]
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    /// Build claims for a new token.
    ///
    /// # Arguments
    /// * `subject` - Identity the token is issued to
    /// * `session` - Credential version of the subject at issuance
    /// * `kind` - Access or refresh
    /// * `issued_at` - Issuance instant (already truncated to microseconds)
    /// * `ttl` - Lifetime of the token
    pub fn new(
        subject: Uuid,
        session: i64,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            jti: Uuid::new_v4(),
            sub: subject,
            session,
            kind,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    /// Check if the token is expired at the given instant.
    ///
    /// A token is no longer valid at its `expires_at` instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Lifetime the token was issued with.
    pub fn lifetime(&self) -> Duration {
        self.expires_at - self.issued_at
    }
}
