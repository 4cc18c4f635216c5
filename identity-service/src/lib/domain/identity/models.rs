use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::errors::EmailError;
use crate::identity::errors::PasswordPolicyError;
use crate::identity::errors::SettingsError;

/// Stored credentials of a registered user.
///
/// Owned by the credential store; the service only reads it and asks the
/// store to create or update it.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: UserId,
    pub email: EmailAddress,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    /// Tokens issued before this instant are no longer honoured.
    /// `None` until the password is changed for the first time. Never moves
    /// backwards.
    pub valid_since: Option<DateTime<Utc>>,
    /// Bumped by the store on every password change; tokens carry the value
    /// they were issued against.
    pub session_version: i64,
}

impl CredentialRecord {
    /// Build a record for a freshly registered user.
    pub fn new(email: EmailAddress, password_hash: String) -> Self {
        Self {
            id: UserId::new(),
            email,
            password_hash,
            created_at: Utc::now(),
            valid_since: None,
            session_version: 0,
        }
    }

    /// Check whether a token minted against credential version `session` at
    /// `issued_at` still belongs to a live session of this user.
    pub fn accepts_token(&self, session: i64, issued_at: DateTime<Utc>) -> bool {
        session == self.session_version
            && self
                .valid_since
                .map_or(true, |valid_since| issued_at >= valid_since)
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    ///
    /// # Returns
    /// UserId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser. Addresses are
/// trimmed and lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Get email as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password that satisfies the length policy.
///
/// Never printed: `Debug` is redacted.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub const MIN_LENGTH: usize = 6;
    pub const MAX_LENGTH: usize = 128;

    /// Validate a plaintext password.
    ///
    /// # Errors
    /// * `TooShort` - Fewer than 6 characters
    /// * `TooLong` - More than 128 characters
    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(password))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Registration payload as received from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
}

impl RegisterUserRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Public view of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CredentialRecord> for UserResponse {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.as_str().to_string(),
            created_at: record.created_at,
        }
    }
}

/// Access and refresh token issued together.
///
/// The two tokens are independently verifiable and carry distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Token id invalidated before its natural expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationEntry {
    pub token_id: Uuid,
    pub revoked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Stored state of a password reset token. Only the hash of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTokenRecord {
    pub token_hash: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

/// Plaintext reset token handed back for out-of-band delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Counts of entries removed by a maintenance sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub revocations: usize,
    pub reset_tokens: usize,
}

/// Lifetimes applied by the authentication service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl AuthSettings {
    /// Validate and build token lifetimes.
    ///
    /// # Errors
    /// * `NonPositiveLifetime` - A lifetime is zero or negative
    /// * `AccessOutlivesRefresh` - Access lifetime is not strictly shorter than refresh lifetime
    pub fn new(
        access_ttl: Duration,
        refresh_ttl: Duration,
        reset_ttl: Duration,
    ) -> Result<Self, SettingsError> {
        for (name, ttl) in [
            ("access", access_ttl),
            ("refresh", refresh_ttl),
            ("password reset", reset_ttl),
        ] {
            if ttl <= Duration::zero() {
                return Err(SettingsError::NonPositiveLifetime(name));
            }
        }
        if access_ttl >= refresh_ttl {
            return Err(SettingsError::AccessOutlivesRefresh);
        }

        Ok(Self {
            access_ttl,
            refresh_ttl,
            reset_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset_ttl
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            reset_ttl: Duration::minutes(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let email = EmailAddress::new("  Alice@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn test_email_rejects_garbage() {
        assert!(EmailAddress::new("not-an-email".to_string()).is_err());
        assert!(EmailAddress::new("".to_string()).is_err());
    }

    #[test]
    fn test_password_length_policy() {
        assert!(Password::new("Secret1".to_string()).is_ok());
        assert_eq!(
            Password::new("abc".to_string()).unwrap_err(),
            PasswordPolicyError::TooShort { min: 6, actual: 3 }
        );
        assert!(matches!(
            Password::new("x".repeat(129)).unwrap_err(),
            PasswordPolicyError::TooLong { max: 128, .. }
        ));
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::new("Secret1".to_string()).unwrap();
        assert!(!format!("{:?}", password).contains("Secret1"));
    }

    #[test]
    fn test_watermark() {
        let mut record = CredentialRecord::new(
            EmailAddress::new("a@x.com".to_string()).unwrap(),
            "$argon2id$hash".to_string(),
        );
        let now = Utc::now();
        assert!(record.accepts_token(0, now - Duration::days(1)));

        record.valid_since = Some(now);
        record.session_version = 1;
        assert!(!record.accepts_token(1, now - Duration::microseconds(1)));
        assert!(record.accepts_token(1, now));
        assert!(record.accepts_token(1, now + Duration::seconds(1)));
    }

    #[test]
    fn test_token_from_older_credentials_is_refused() {
        let mut record = CredentialRecord::new(
            EmailAddress::new("a@x.com".to_string()).unwrap(),
            "$argon2id$hash".to_string(),
        );
        let before = Utc::now();
        record.session_version = 2;

        // Issued after the watermark but against superseded credentials
        assert!(!record.accepts_token(1, before + Duration::seconds(1)));
        assert!(record.accepts_token(2, before + Duration::seconds(1)));
    }

    #[test]
    fn test_settings_require_access_shorter_than_refresh() {
        let result = AuthSettings::new(
            Duration::hours(1),
            Duration::hours(1),
            Duration::minutes(30),
        );
        assert_eq!(result.unwrap_err(), SettingsError::AccessOutlivesRefresh);

        let result = AuthSettings::new(Duration::zero(), Duration::hours(1), Duration::minutes(30));
        assert_eq!(result.unwrap_err(), SettingsError::NonPositiveLifetime("access"));
    }

    #[test]
    fn test_default_settings_are_valid() {
        let defaults = AuthSettings::default();
        let rebuilt = AuthSettings::new(
            defaults.access_ttl(),
            defaults.refresh_ttl(),
            defaults.reset_ttl(),
        )
        .unwrap();
        assert_eq!(defaults, rebuilt);
    }

    #[test]
    fn test_user_response_serializes_plain_id() {
        let record = CredentialRecord::new(
            EmailAddress::new("a@x.com".to_string()).unwrap(),
            "$argon2id$hash".to_string(),
        );
        let json = serde_json::to_value(UserResponse::from(&record)).unwrap();

        assert_eq!(json["id"], serde_json::json!(record.id.0.to_string()));
        assert_eq!(json["email"], "a@x.com");
    }

    #[test]
    fn test_register_request_deserializes() {
        let request: RegisterUserRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"Secret1"}"#).unwrap();

        assert_eq!(request.email, "a@x.com");
        assert_eq!(request.password, "Secret1");
    }
}
