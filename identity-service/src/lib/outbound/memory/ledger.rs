use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::identity::errors::LedgerError;
use crate::identity::models::RevocationEntry;
use crate::identity::ports::RevocationLedger;

/// Revocation ledger kept in process memory.
///
/// Holds only revoked tokens that have not expired yet; expired entries are
/// dropped by `sweep` and lazily when read.
#[derive(Default)]
pub struct InMemoryRevocationLedger {
    entries: DashMap<Uuid, RevocationEntry>,
}

impl InMemoryRevocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevocationLedger for InMemoryRevocationLedger {
    async fn revoke(
        &self,
        token_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        match self.entries.entry(token_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(RevocationEntry {
                    token_id,
                    revoked_at: Utc::now(),
                    expires_at,
                });
                Ok(true)
            }
        }
    }

    async fn is_revoked(&self, token_id: Uuid) -> Result<bool, LedgerError> {
        let now = Utc::now();
        let expired = match self.entries.get(&token_id) {
            Some(entry) => entry.expires_at <= now,
            None => return Ok(false),
        };

        if expired {
            // The token fails its own expiry check from here on
            self.entries
                .remove_if(&token_id, |_, entry| entry.expires_at <= now);
            return Ok(false);
        }

        Ok(true)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.expires_at > now;
            if !live {
                removed += 1;
            }
            live
        });

        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Revocation ledger swept");
        }

        Ok(removed)
    }
}
