//! Reset token secrets.
//!
//! A reset token is 32 bytes from the operating system CSPRNG, hex encoded.
//! Stores keep only the SHA-256 of the token, so a leaked store cannot be
//! replayed.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

const RESET_TOKEN_BYTES: usize = 32;

/// Generate a reset token and its hash.
///
/// # Returns
/// `(token, token_hash)`: the token goes to the user, the hash to storage
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let hash = hash_reset_token(&token);
    (token, hash)
}

/// Hash a reset token for storage or lookup.
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
