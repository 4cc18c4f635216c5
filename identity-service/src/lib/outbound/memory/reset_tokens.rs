use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::identity::errors::ResetTokenError;
use crate::identity::models::PasswordResetTicket;
use crate::identity::models::ResetTokenRecord;
use crate::identity::models::UserId;
use crate::identity::ports::ResetTokenStore;
use crate::identity::reset::generate_reset_token;
use crate::identity::reset::hash_reset_token;

/// Reset token store kept in process memory.
///
/// Lock order is always `live` before `tokens`; `consume` releases its
/// token entry before touching `live`.
#[derive(Default)]
pub struct InMemoryResetTokenStore {
    // token hash -> record; consumed records stay until they expire
    tokens: DashMap<String, ResetTokenRecord>,
    // user -> hash of the only token that may still be consumed
    live: DashMap<UserId, String>,
}

impl InMemoryResetTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, user_id: UserId, ttl: Duration, now: DateTime<Utc>) -> PasswordResetTicket {
        let (token, token_hash) = generate_reset_token();
        let record = ResetTokenRecord {
            token_hash: token_hash.clone(),
            user_id,
            expires_at: now + ttl,
            consumed: false,
        };
        let expires_at = record.expires_at;

        match self.live.entry(user_id) {
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(token_hash.clone());
                self.tokens.remove(&previous);
                self.tokens.insert(token_hash, record);
            }
            Entry::Vacant(slot) => {
                self.tokens.insert(token_hash.clone(), record);
                slot.insert(token_hash);
            }
        }

        PasswordResetTicket { token, expires_at }
    }

    fn take(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, ResetTokenError> {
        let token_hash = hash_reset_token(token);

        let user_id = {
            let mut record = self
                .tokens
                .get_mut(&token_hash)
                .ok_or(ResetTokenError::NotFound)?;

            if record.consumed {
                return Err(ResetTokenError::AlreadyConsumed);
            }
            if record.expires_at <= now {
                return Err(ResetTokenError::Expired);
            }

            record.consumed = true;
            record.user_id
        };

        self.live
            .remove_if(&user_id, |_, live_hash| *live_hash == token_hash);

        Ok(user_id)
    }
}

#[async_trait]
impl ResetTokenStore for InMemoryResetTokenStore {
    async fn issue(
        &self,
        user_id: UserId,
        ttl: Duration,
    ) -> Result<PasswordResetTicket, ResetTokenError> {
        Ok(self.store(user_id, ttl, Utc::now()))
    }

    async fn consume(&self, token: &str) -> Result<UserId, ResetTokenError> {
        self.take(token, Utc::now())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, ResetTokenError> {
        let mut removed = 0;
        self.live.retain(|_, token_hash| {
            self.tokens
                .get(token_hash.as_str())
                .map_or(false, |record| record.expires_at > now)
        });
        self.tokens.retain(|_, record| {
            let live = record.expires_at > now;
            if !live {
                removed += 1;
            }
            live
        });

        Ok(removed)
    }
}
