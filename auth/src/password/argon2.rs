use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::Version;

use super::errors::PasswordError;

/// Input hashed once per hasher to produce the decoy hash.
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// Password hashing implementation.
///
/// Provides cryptographic password hashing (internally uses Argon2id).
pub struct PasswordHasher {
    params: Params,
    // Computed at construction; verify_decoy never hashes
    decoy_hash: String,
}

impl PasswordHasher {
    /// Create a password hasher with the Argon2 crate defaults
    /// (19 MiB memory, 2 iterations, 1 lane).
    ///
    /// # Errors
    /// * `HashingFailed` - The decoy hash could not be computed
    pub fn new() -> Result<Self, PasswordError> {
        Self::from_params(Params::default())
    }

    /// Create a password hasher with custom cost parameters.
    ///
    /// # Arguments
    /// * `memory_kib` - Memory cost in KiB
    /// * `iterations` - Number of passes
    /// * `parallelism` - Degree of parallelism
    ///
    /// # Errors
    /// * `InvalidParameters` - Parameters rejected by Argon2
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordError::InvalidParameters(e.to_string()))?;

        Self::from_params(params)
    }

    fn from_params(params: Params) -> Result<Self, PasswordError> {
        let decoy_hash = hash_with(&params, DECOY_PASSWORD)?;

        Ok(Self { params, decoy_hash })
    }

    /// Hash a plaintext password securely.
    ///
    /// Uses Argon2id with random salt generation.
    ///
    /// # Returns
    /// PHC string format hash (includes algorithm, parameters, salt, and hash)
    ///
    /// # Errors
    /// * `HashingFailed` - Password hashing operation failed
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash_with(&self.params, password)
    }

    /// Verify a password against a stored hash.
    ///
    /// # Returns
    /// True if password matches, false otherwise
    ///
    /// # Errors
    /// * `VerificationFailed` - Hash format is invalid
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            PasswordError::VerificationFailed(format!("Invalid password hash: {}", e))
        })?;

        Ok(argon2(&self.params)
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Spend the same work as [`verify`](Self::verify) without a real hash.
    ///
    /// Used when no stored hash exists for the presented identity, so that
    /// the caller cannot tell a missing account from a wrong password by
    /// response time. Always returns `false`.
    pub fn verify_decoy(&self, password: &str) -> Result<bool, PasswordError> {
        self.verify(password, &self.decoy_hash)?;
        Ok(false)
    }
}

fn argon2(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_with(params: &Params, password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    argon2(params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}
