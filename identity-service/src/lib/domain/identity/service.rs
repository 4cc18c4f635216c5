use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenClaims;
use auth::TokenCodec;
use auth::TokenKind;
use chrono::DateTime;
use chrono::Utc;

use crate::identity::errors::AuthError;
use crate::identity::models::AuthSettings;
use crate::identity::models::CredentialRecord;
use crate::identity::models::Password;
use crate::identity::models::PasswordResetTicket;
use crate::identity::models::RegisterUserRequest;
use crate::identity::models::SweepReport;
use crate::identity::models::TokenPair;
use crate::identity::models::UserId;
use crate::identity::models::UserResponse;
use crate::identity::ports::AuthServicePort;
use crate::identity::ports::CredentialStore;
use crate::identity::ports::ResetTokenStore;
use crate::identity::ports::RevocationLedger;
use crate::identity::verifier::CredentialVerifier;

/// Domain service implementation for authentication operations.
///
/// Holds no state of its own: credentials, revocations and reset tokens
/// live in the injected stores.
pub struct AuthService<CS, RL, RS>
where
    CS: CredentialStore,
    RL: RevocationLedger,
    RS: ResetTokenStore,
{
    verifier: CredentialVerifier<CS>,
    codec: TokenCodec,
    ledger: Arc<RL>,
    reset_tokens: Arc<RS>,
    settings: AuthSettings,
}

impl<CS, RL, RS> AuthService<CS, RL, RS>
where
    CS: CredentialStore,
    RL: RevocationLedger,
    RS: ResetTokenStore,
{
    /// Create a new authentication service with injected dependencies.
    ///
    /// # Arguments
    /// * `credentials` - Credential store implementation
    /// * `ledger` - Revocation ledger implementation
    /// * `reset_tokens` - Reset token store implementation
    /// * `codec` - Token signing key holder
    /// * `hasher` - Password hasher
    /// * `settings` - Token lifetimes
    pub fn new(
        credentials: Arc<CS>,
        ledger: Arc<RL>,
        reset_tokens: Arc<RS>,
        codec: TokenCodec,
        hasher: PasswordHasher,
        settings: AuthSettings,
    ) -> Self {
        Self {
            verifier: CredentialVerifier::new(credentials, hasher),
            codec,
            ledger,
            reset_tokens,
            settings,
        }
    }

    /// Remove revocations and reset tokens that expired by `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, AuthError> {
        let revocations = self.ledger.sweep(now).await?;
        let reset_tokens = self.reset_tokens.sweep(now).await?;

        Ok(SweepReport {
            revocations,
            reset_tokens,
        })
    }

    /// Issue a pair bound to the session version of `record`.
    fn issue_pair(&self, record: &CredentialRecord) -> Result<TokenPair, AuthError> {
        let (subject, session) = (record.id.0, record.session_version);
        let access = self.codec.issue(
            subject,
            session,
            TokenKind::Access,
            self.settings.access_ttl(),
        )?;
        let refresh = self.codec.issue(
            subject,
            session,
            TokenKind::Refresh,
            self.settings.refresh_ttl(),
        )?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.claims.expires_at,
            refresh_expires_at: refresh.claims.expires_at,
        })
    }

    fn decode(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.decode(token)?;
        if claims.kind != expected {
            return Err(AuthError::InvalidToken(format!(
                "Expected {} token, got {} token",
                expected, claims.kind
            )));
        }

        Ok(claims)
    }

    /// Check that the subject still exists and that its session was not
    /// invalidated after the token was issued.
    async fn ensure_session_current(
        &self,
        claims: &TokenClaims,
    ) -> Result<CredentialRecord, AuthError> {
        let record = self
            .verifier
            .find_by_id(&UserId(claims.sub))
            .await?
            .ok_or_else(|| AuthError::InvalidToken("Unknown token subject".to_string()))?;

        if !record.accepts_token(claims.session, claims.issued_at) {
            return Err(AuthError::Revoked);
        }

        Ok(record)
    }

    /// Full access token check: signature, expiry, kind, revocation and
    /// session watermark.
    async fn authenticate(&self, access_token: &str) -> Result<CredentialRecord, AuthError> {
        let claims = self.decode(access_token, TokenKind::Access)?;

        if self.ledger.is_revoked(claims.jti).await? {
            return Err(AuthError::Revoked);
        }

        self.ensure_session_current(&claims).await
    }

    async fn set_password(&self, id: &UserId, new_password: Password) -> Result<(), AuthError> {
        let session_version = self.verifier.update_password(id, new_password).await?;

        tracing::info!(
            user_id = %id,
            session_version,
            "Password updated, earlier sessions invalidated"
        );

        Ok(())
    }
}

#[async_trait]
impl<CS, RL, RS> AuthServicePort for AuthService<CS, RL, RS>
where
    CS: CredentialStore,
    RL: RevocationLedger,
    RS: ResetTokenStore,
{
    async fn register(&self, request: RegisterUserRequest) -> Result<UserResponse, AuthError> {
        let record = self
            .verifier
            .create_credentials(request)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Registration rejected"))?;

        tracing::info!(user_id = %record.id, "User registered");

        Ok(UserResponse::from(&record))
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let checked = self.verifier.verify(email, password).await.inspect_err(|e| {
            if let AuthError::Internal(_) = e {
                tracing::error!(error = %e, "Credential verification failed");
            } else {
                tracing::warn!("Login failed: invalid credentials");
            }
        })?;

        // The password may have changed while it was being verified
        let current = self.verifier.find_by_id(&checked.id).await?;
        if current.map(|record| record.session_version) != Some(checked.session_version) {
            tracing::warn!(
                user_id = %checked.id,
                "Login failed: password changed during verification"
            );
            return Err(AuthError::InvalidCredentials);
        }

        // Tokens carry the checked version, so a change after this point
        // still invalidates them
        let pair = self.issue_pair(&checked)?;
        tracing::info!(user_id = %checked.id, "User logged in");

        Ok(pair)
    }

    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self
            .decode(access_token, TokenKind::Access)
            .inspect_err(|e| tracing::warn!(error = %e, "Logout with unusable token"))?;

        let recorded = self.ledger.revoke(claims.jti, claims.expires_at).await?;
        if recorded {
            tracing::info!(user_id = %claims.sub, token_id = %claims.jti, "User logged out");
        } else {
            tracing::debug!(token_id = %claims.jti, "Logout of an already revoked token");
        }

        Ok(())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .decode(refresh_token, TokenKind::Refresh)
            .inspect_err(|e| tracing::warn!(error = %e, "Refresh with unusable token"))?;

        let record = self.ensure_session_current(&claims).await?;

        // Consuming the old token is the test-and-set: only one caller wins
        if !self.ledger.revoke(claims.jti, claims.expires_at).await? {
            tracing::warn!(
                user_id = %record.id,
                token_id = %claims.jti,
                "Refresh token replayed"
            );
            return Err(AuthError::Revoked);
        }

        let pair = self.issue_pair(&record)?;
        tracing::debug!(user_id = %record.id, token_id = %claims.jti, "Refresh token rotated");

        Ok(pair)
    }

    async fn is_user_authenticated(&self, access_token: &str) -> bool {
        match self.authenticate(access_token).await {
            Ok(_) => true,
            Err(AuthError::Internal(e)) => {
                tracing::error!(error = %e, "Authentication check failed");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "Access token rejected");
                false
            }
        }
    }

    async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<PasswordResetTicket, AuthError> {
        let record = self
            .verifier
            .find_by_email(email)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Password reset request rejected"))?;

        let ticket = self
            .reset_tokens
            .issue(record.id, self.settings.reset_ttl())
            .await?;
        tracing::info!(
            user_id = %record.id,
            expires_at = %ticket.expires_at,
            "Password reset token issued"
        );

        Ok(ticket)
    }

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        // Validate first so a rejected password does not burn the token
        let new_password = Password::new(new_password.to_string())?;

        let user_id = self
            .reset_tokens
            .consume(token)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Password reset confirmation rejected"))?;

        self.set_password(&user_id, new_password).await
    }

    async fn change_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let record = self
            .authenticate(access_token)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Password change rejected"))?;
        let new_password = Password::new(new_password.to_string())?;

        self.set_password(&record.id, new_password).await
    }

    async fn get_id_from_token(&self, access_token: &str) -> Result<UserId, AuthError> {
        self.authenticate(access_token).await.map(|record| record.id)
    }
}
