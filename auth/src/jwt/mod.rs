pub mod claims;
pub mod codec;
pub mod errors;

pub use claims::TokenClaims;
pub use claims::TokenKind;
pub use codec::IssuedToken;
pub use codec::TokenCodec;
pub use errors::TokenError;
