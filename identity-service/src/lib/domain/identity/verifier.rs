use std::sync::Arc;

use auth::PasswordHasher;
use chrono::SubsecRound;
use chrono::Utc;

use crate::identity::errors::AuthError;
use crate::identity::models::CredentialRecord;
use crate::identity::models::EmailAddress;
use crate::identity::models::Password;
use crate::identity::models::RegisterUserRequest;
use crate::identity::models::UserId;
use crate::identity::ports::CredentialStore;

/// Checks passwords against the credential store.
///
/// Argon2 work is CPU bound and runs on the blocking pool.
pub struct CredentialVerifier<CS>
where
    CS: CredentialStore,
{
    store: Arc<CS>,
    hasher: Arc<PasswordHasher>,
}

impl<CS> CredentialVerifier<CS>
where
    CS: CredentialStore,
{
    pub fn new(store: Arc<CS>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
        }
    }

    /// Verify an email/password pair.
    ///
    /// Unknown emails still pay for one hash verification so they cannot be
    /// told apart from wrong passwords, neither by error nor by timing.
    ///
    /// # Returns
    /// The record the password was checked against
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown or malformed email, or wrong password
    /// * `Internal` - Store or hashing failure
    pub async fn verify(&self, email: &str, password: &str) -> Result<CredentialRecord, AuthError> {
        let record = match EmailAddress::new(email.to_string()) {
            Ok(email) => self.store.find_by_email(&email).await?,
            Err(_) => None,
        };

        let stored_hash = record.as_ref().map(|r| r.password_hash.clone());
        let matched = self.check_password(password, stored_hash).await?;

        match record {
            Some(record) if matched => Ok(record),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    /// Validate a registration payload and persist new credentials.
    ///
    /// # Errors
    /// * `InvalidInput` - Malformed email or password outside the length policy
    /// * `DuplicateEmail` - Email is already registered
    pub async fn create_credentials(
        &self,
        request: RegisterUserRequest,
    ) -> Result<CredentialRecord, AuthError> {
        let email = EmailAddress::new(request.email)?;
        let password = Password::new(request.password)?;

        let password_hash = self.hash_password(password).await?;
        let record = self
            .store
            .create(CredentialRecord::new(email, password_hash))
            .await?;

        Ok(record)
    }

    /// Replace the stored password hash.
    ///
    /// Every token issued before the change stops being honoured.
    ///
    /// # Returns
    /// The new session version
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    pub async fn update_password(
        &self,
        id: &UserId,
        new_password: Password,
    ) -> Result<i64, AuthError> {
        let password_hash = self.hash_password(new_password).await?;
        let valid_since = Utc::now().trunc_subsecs(6);

        Ok(self
            .store
            .update_password_hash(id, password_hash, valid_since)
            .await?)
    }

    /// Look up credentials by email.
    ///
    /// # Errors
    /// * `InvalidInput` - Malformed email
    /// * `NotFound` - No user with this email
    pub async fn find_by_email(&self, email: &str) -> Result<CredentialRecord, AuthError> {
        let email = EmailAddress::new(email.to_string())?;

        self.store
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::NotFound(email.to_string()))
    }

    pub async fn find_by_id(&self, id: &UserId) -> Result<Option<CredentialRecord>, AuthError> {
        Ok(self.store.find_by_id(id).await?)
    }

    async fn hash_password(&self, password: Password) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || hasher.hash(password.as_str()))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(AuthError::from)
    }

    async fn check_password(
        &self,
        password: &str,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();

        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_decoy(&password),
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::memory::InMemoryCredentialStore;

    fn verifier() -> CredentialVerifier<InMemoryCredentialStore> {
        CredentialVerifier::new(
            Arc::new(InMemoryCredentialStore::new()),
            PasswordHasher::with_params(1024, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_and_verify() {
        let verifier = verifier();

        let record = verifier
            .create_credentials(RegisterUserRequest::new("a@x.com", "Secret1"))
            .await
            .expect("Failed to create credentials");
        assert!(record.password_hash.starts_with("$argon2"));
        assert_ne!(record.password_hash, "Secret1");

        let verified = verifier.verify("a@x.com", "Secret1").await.unwrap();
        assert_eq!(verified.id, record.id);
        assert_eq!(verified.session_version, 0);
    }

    #[tokio::test]
    async fn test_verify_is_case_insensitive_on_email() {
        let verifier = verifier();
        verifier
            .create_credentials(RegisterUserRequest::new("Alice@X.com", "Secret1"))
            .await
            .unwrap();

        assert!(verifier.verify("alice@x.COM", "Secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let verifier = verifier();
        verifier
            .create_credentials(RegisterUserRequest::new("real@x.com", "Secret1"))
            .await
            .unwrap();

        let unknown = verifier.verify("nobody@x.com", "pw").await.unwrap_err();
        let wrong = verifier.verify("real@x.com", "wrongpw").await.unwrap_err();
        let malformed = verifier.verify("not an email", "pw").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let verifier = verifier();

        let result = verifier
            .create_credentials(RegisterUserRequest::new("bogus", "Secret1"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));

        let result = verifier
            .create_credentials(RegisterUserRequest::new("a@x.com", "123"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let verifier = verifier();
        verifier
            .create_credentials(RegisterUserRequest::new("a@x.com", "Secret1"))
            .await
            .unwrap();

        let result = verifier
            .create_credentials(RegisterUserRequest::new("A@x.com", "Other12"))
            .await;
        assert!(matches!(result, Err(AuthError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_update_password() {
        let verifier = verifier();
        let record = verifier
            .create_credentials(RegisterUserRequest::new("a@x.com", "Secret1"))
            .await
            .unwrap();

        let before = Utc::now().trunc_subsecs(6);
        let version = verifier
            .update_password(&record.id, Password::new("NewPass1".to_string()).unwrap())
            .await
            .unwrap();

        assert!(verifier.verify("a@x.com", "Secret1").await.is_err());
        let verified = verifier.verify("a@x.com", "NewPass1").await.unwrap();
        assert_eq!(verified.session_version, version);
        assert_eq!(version, 1);

        let updated = verifier.find_by_id(&record.id).await.unwrap().unwrap();
        assert!(updated.valid_since.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_update_password_unknown_user() {
        let verifier = verifier();

        let result = verifier
            .update_password(&UserId::new(), Password::new("NewPass1".to_string()).unwrap())
            .await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }
}
