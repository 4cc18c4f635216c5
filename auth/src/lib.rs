//! Authentication primitives library
//!
//! Provides the cryptographic building blocks of the identity provider:
//! - Password hashing (Argon2id)
//! - Signed session tokens with access/refresh kinds
//!
//! Both are pure computations. Anything stateful (revocation, reset tokens,
//! credential storage) lives in the service crate behind its own ports.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::with_params(1024, 1, 1).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::{TokenCodec, TokenKind};
//! use chrono::Duration;
//! use uuid::Uuid;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!");
//! let user = Uuid::new_v4();
//! let issued = codec.issue(user, 0, TokenKind::Access, Duration::minutes(15)).unwrap();
//!
//! let claims = codec.decode(&issued.token).unwrap();
//! assert_eq!(claims.sub, user);
//! assert_eq!(claims.kind, TokenKind::Access);
//! ```

pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use jwt::IssuedToken;
pub use jwt::TokenClaims;
pub use jwt::TokenCodec;
pub use jwt::TokenError;
pub use jwt::TokenKind;
pub use password::PasswordError;
pub use password::PasswordHasher;
