use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::identity::errors::AuthError;
use crate::identity::errors::CredentialStoreError;
use crate::identity::errors::LedgerError;
use crate::identity::errors::ResetTokenError;
use crate::identity::models::CredentialRecord;
use crate::identity::models::EmailAddress;
use crate::identity::models::PasswordResetTicket;
use crate::identity::models::RegisterUserRequest;
use crate::identity::models::TokenPair;
use crate::identity::models::UserId;
use crate::identity::models::UserResponse;

/// Port for authentication operations.
///
/// Every caller-facing operation of the identity provider goes through this
/// trait; the credential store, ledger and reset token store are never
/// reached directly.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new user. Does not log the user in.
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is already registered
    /// * `InvalidInput` - Malformed email or password outside the length policy
    async fn register(&self, request: RegisterUserRequest) -> Result<UserResponse, AuthError>;

    /// Verify credentials and issue a fresh token pair.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Revoke the presented access token.
    ///
    /// Only the access token is revoked; a refresh token from the same login
    /// stays usable.
    ///
    /// # Errors
    /// * `InvalidToken` - Malformed, forged or non-access token
    /// * `Expired` - Token already expired
    async fn logout(&self, access_token: &str) -> Result<(), AuthError>;

    /// Rotate a refresh token into a new token pair.
    ///
    /// The presented refresh token is consumed; presenting it again fails.
    ///
    /// # Errors
    /// * `InvalidToken` - Malformed, forged or non-refresh token
    /// * `Revoked` - Token already used, or the session was invalidated
    /// * `Expired` - Token expired
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Whether the access token currently authenticates its user.
    ///
    /// Never fails: every problem with the token yields `false`.
    async fn is_user_authenticated(&self, access_token: &str) -> bool;

    /// Issue a password reset token for out-of-band delivery.
    ///
    /// # Errors
    /// * `NotFound` - No user with this email
    /// * `InvalidInput` - Malformed email
    async fn request_password_reset(&self, email: &str)
        -> Result<PasswordResetTicket, AuthError>;

    /// Consume a reset token and set a new password.
    ///
    /// Ends every outstanding session of the user.
    ///
    /// # Errors
    /// * `InvalidToken` - Unknown reset token
    /// * `Expired` - Reset token expired
    /// * `AlreadyConsumed` - Reset token already used
    /// * `InvalidInput` - New password outside the length policy
    async fn confirm_password_reset(&self, token: &str, new_password: &str)
        -> Result<(), AuthError>;

    /// Set a new password for the user the access token belongs to.
    ///
    /// Ends every outstanding session of the user, including the caller's.
    ///
    /// # Errors
    /// * `InvalidToken` - Token does not authenticate a user
    /// * `Revoked` - Token was revoked
    /// * `NotFound` - User disappeared from the credential store
    /// * `InvalidInput` - New password outside the length policy
    async fn change_password(&self, access_token: &str, new_password: &str)
        -> Result<(), AuthError>;

    /// Resolve the identity an access token was issued to.
    ///
    /// # Errors
    /// * `InvalidToken` - Malformed, forged or non-access token
    /// * `Expired` - Token expired
    /// * `Revoked` - Token was revoked or its session invalidated
    async fn get_id_from_token(&self, access_token: &str) -> Result<UserId, AuthError>;
}

/// Persistence operations for user credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Retrieve credentials by email address.
    ///
    /// # Returns
    /// Optional record (None if not found)
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError>;

    /// Retrieve credentials by identifier.
    async fn find_by_id(&self, id: &UserId)
        -> Result<Option<CredentialRecord>, CredentialStoreError>;

    /// Persist new credentials.
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is already registered
    async fn create(&self, record: CredentialRecord)
        -> Result<CredentialRecord, CredentialStoreError>;

    /// Replace the password hash and advance the session watermark.
    ///
    /// Must be atomic per user: the hash is replaced, `session_version` is
    /// incremented and `valid_since` becomes the later of its current value
    /// and `valid_since`, all in one step.
    ///
    /// # Returns
    /// The new session version
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    async fn update_password_hash(
        &self,
        id: &UserId,
        password_hash: String,
        valid_since: DateTime<Utc>,
    ) -> Result<i64, CredentialStoreError>;
}

/// Record of token ids invalidated before their natural expiry.
///
/// Implementations must be linearizable per token id: once `revoke`
/// returns, every later `is_revoked` for that id observes it until the
/// entry's expiry.
#[async_trait]
pub trait RevocationLedger: Send + Sync + 'static {
    /// Revoke a token id until `expires_at`.
    ///
    /// # Returns
    /// `true` if this call recorded the revocation, `false` if the id was
    /// already revoked
    async fn revoke(&self, token_id: Uuid, expires_at: DateTime<Utc>)
        -> Result<bool, LedgerError>;

    async fn is_revoked(&self, token_id: Uuid) -> Result<bool, LedgerError>;

    /// Drop entries whose token has expired by `now`.
    ///
    /// # Returns
    /// Number of entries removed
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, LedgerError>;
}

/// Single-use, time-boxed password reset tokens.
#[async_trait]
pub trait ResetTokenStore: Send + Sync + 'static {
    /// Issue a new reset token for `user_id`, valid for `ttl`.
    ///
    /// Any earlier unconsumed token of the same user stops working.
    async fn issue(&self, user_id: UserId, ttl: Duration)
        -> Result<PasswordResetTicket, ResetTokenError>;

    /// Atomically validate and consume a reset token.
    ///
    /// # Errors
    /// * `NotFound` - Unknown token, or superseded by a newer one
    /// * `Expired` - Token expired
    /// * `AlreadyConsumed` - Token was used before
    async fn consume(&self, token: &str) -> Result<UserId, ResetTokenError>;

    /// Drop tokens that expired by `now`.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, ResetTokenError>;
}
