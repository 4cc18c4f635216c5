use auth::PasswordError;
use auth::TokenError;
use thiserror::Error;

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for Password policy failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Password too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for invalid service settings
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("The {0} token lifetime must be positive")]
    NonPositiveLifetime(&'static str),

    #[error("Access tokens must expire strictly before refresh tokens")]
    AccessOutlivesRefresh,

    #[error("Token secret too short: minimum {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },

    #[error("Invalid password hashing parameters: {0}")]
    PasswordHashing(String),
}

/// Error returned by credential store implementations
#[derive(Debug, Clone, Error)]
pub enum CredentialStoreError {
    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Credential store failure: {0}")]
    Backend(String),
}

/// Error returned by revocation ledger implementations
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Revocation ledger failure: {0}")]
    Backend(String),
}

/// Error returned by reset token store implementations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResetTokenError {
    #[error("Reset token not found")]
    NotFound,

    #[error("Reset token has expired")]
    Expired,

    #[error("Reset token was already used")]
    AlreadyConsumed,

    #[error("Reset token store failure: {0}")]
    Backend(String),
}

/// Failure category surfaced by the authentication service.
///
/// Transport layers map these to their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    InvalidCredentials,
    DuplicateEmail,
    InvalidInput,
    InvalidToken,
    Expired,
    Revoked,
    AlreadyConsumed,
    NotFound,
    Internal,
}

/// Top-level error for all authentication operations
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. The two cases are never distinguished.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Reset token was already used")]
    AlreadyConsumed,

    #[error("Not found: {0}")]
    NotFound(String),

    // Infrastructure errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::InvalidCredentials => AuthErrorKind::InvalidCredentials,
            AuthError::DuplicateEmail(_) => AuthErrorKind::DuplicateEmail,
            AuthError::InvalidInput(_) => AuthErrorKind::InvalidInput,
            AuthError::InvalidToken(_) => AuthErrorKind::InvalidToken,
            AuthError::Expired => AuthErrorKind::Expired,
            AuthError::Revoked => AuthErrorKind::Revoked,
            AuthError::AlreadyConsumed => AuthErrorKind::AlreadyConsumed,
            AuthError::NotFound(_) => AuthErrorKind::NotFound,
            AuthError::Internal(_) => AuthErrorKind::Internal,
        }
    }
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

impl From<PasswordPolicyError> for AuthError {
    fn from(err: PasswordPolicyError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

impl From<CredentialStoreError> for AuthError {
    fn from(err: CredentialStoreError) -> Self {
        match err {
            CredentialStoreError::DuplicateEmail(email) => AuthError::DuplicateEmail(email),
            CredentialStoreError::NotFound(id) => AuthError::NotFound(id),
            CredentialStoreError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<LedgerError> for AuthError {
    fn from(err: LedgerError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<ResetTokenError> for AuthError {
    fn from(err: ResetTokenError) -> Self {
        match err {
            ResetTokenError::NotFound => AuthError::InvalidToken(err.to_string()),
            ResetTokenError::Expired => AuthError::Expired,
            ResetTokenError::AlreadyConsumed => AuthError::AlreadyConsumed,
            ResetTokenError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed(_) | TokenError::SignatureInvalid => {
                AuthError::InvalidToken(err.to_string())
            }
            TokenError::Expired => AuthError::Expired,
            TokenError::EncodingFailed(_) | TokenError::InvalidLifetime => {
                AuthError::Internal(err.to_string())
            }
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
