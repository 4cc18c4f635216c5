use chrono::DateTime;
use chrono::Duration;
use chrono::SubsecRound;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use uuid::Uuid;

use super::claims::TokenClaims;
use super::claims::TokenKind;
use super::errors::TokenError;

/// A freshly signed token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Signs and verifies session tokens.
///
/// Uses HS256 (HMAC with SHA-256). Issuing and decoding are pure computations:
/// no storage is touched, so a valid token can be checked without any lookup.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenCodec {
    /// Create a new codec with a secret key.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// Issue a signed token for `subject` that lives for `ttl`.
    ///
    /// `session` is echoed back by [`decode`](Self::decode) so the caller can
    /// reject tokens minted against credentials that have since changed.
    ///
    /// # Errors
    /// * `InvalidLifetime` - `ttl` is zero or negative
    /// * `EncodingFailed` - Token signing failed
    pub fn issue(
        &self,
        subject: Uuid,
        session: i64,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, session, kind, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject: Uuid,
        session: i64,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidLifetime);
        }

        let claims = TokenClaims::new(subject, session, kind, now.trunc_subsecs(6), ttl);
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is verified before any claim is trusted; expiry is
    /// checked afterwards against the current time.
    ///
    /// # Errors
    /// * `Malformed` - Token is not a well-formed JWT carrying our claims
    /// * `SignatureInvalid` - Token was not signed with our key and algorithm
    /// * `Expired` - Token is past its `expires_at`
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry lives in our own microsecond claims and is checked below
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let token_data =
            decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        TokenError::SignatureInvalid
                    }
                    _ => TokenError::Malformed(e.to_string()),
                }
            })?;

        let claims = token_data.claims;
        if claims.is_expired(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
