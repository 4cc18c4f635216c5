//! In-memory adapters for every storage port.
//!
//! Each adapter locks per key through `DashMap` shards, so operations on
//! unrelated users or tokens never contend on a global lock.

pub mod credentials;
pub mod ledger;
pub mod reset_tokens;

pub use credentials::InMemoryCredentialStore;
pub use ledger::InMemoryRevocationLedger;
pub use reset_tokens::InMemoryResetTokenStore;
