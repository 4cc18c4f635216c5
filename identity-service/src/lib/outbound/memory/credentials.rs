use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::identity::errors::CredentialStoreError;
use crate::identity::models::CredentialRecord;
use crate::identity::models::EmailAddress;
use crate::identity::models::UserId;
use crate::identity::ports::CredentialStore;

/// Credential store kept in process memory.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: DashMap<UserId, CredentialRecord>,
    // Unique index: normalized email -> owner
    emails: DashMap<String, UserId>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        let id = match self.emails.get(email.as_str()) {
            Some(id) => *id,
            None => return Ok(None),
        };

        Ok(self.records.get(&id).map(|record| record.clone()))
    }

    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        Ok(self.records.get(id).map(|record| record.clone()))
    }

    async fn create(
        &self,
        record: CredentialRecord,
    ) -> Result<CredentialRecord, CredentialStoreError> {
        // The email entry stays locked until the record is in place
        match self.emails.entry(record.email.as_str().to_string()) {
            Entry::Occupied(_) => Err(CredentialStoreError::DuplicateEmail(
                record.email.as_str().to_string(),
            )),
            Entry::Vacant(slot) => {
                self.records.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(record)
            }
        }
    }

    async fn update_password_hash(
        &self,
        id: &UserId,
        password_hash: String,
        valid_since: DateTime<Utc>,
    ) -> Result<i64, CredentialStoreError> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| CredentialStoreError::NotFound(id.to_string()))?;

        record.password_hash = password_hash;
        record.valid_since = record.valid_since.max(Some(valid_since));
        record.session_version += 1;

        Ok(record.session_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str) -> CredentialRecord {
        CredentialRecord::new(
            EmailAddress::new(email.to_string()).unwrap(),
            "$argon2id$test_hash".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(record("a@x.com")).await.unwrap();

        let by_email = store
            .find_by_email(&EmailAddress::new("a@x.com".to_string()).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, created.email);
    }

    #[tokio::test]
    async fn test_find_missing() {
        let store = InMemoryCredentialStore::new();

        assert!(store.find_by_id(&UserId::new()).await.unwrap().is_none());
        assert!(store
            .find_by_email(&EmailAddress::new("nobody@x.com".to_string()).unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = InMemoryCredentialStore::new();
        store.create(record("a@x.com")).await.unwrap();

        let result = store.create(record("a@x.com")).await;
        assert!(matches!(result, Err(CredentialStoreError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_concurrent_registrations_with_same_email() {
        let store = std::sync::Arc::new(InMemoryCredentialStore::new());

        let attempts = (0..16).map(|_| {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move { store.create(record("race@x.com")).await })
        });
        let results = futures::future::join_all(attempts).await;

        let created = results
            .into_iter()
            .filter(|result| matches!(result, Ok(Ok(_))))
            .count();
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_update_password_hash() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(record("a@x.com")).await.unwrap();
        let now = Utc::now();

        let version = store
            .update_password_hash(&created.id, "$argon2id$new".to_string(), now)
            .await
            .unwrap();

        let updated = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "$argon2id$new");
        assert_eq!(updated.valid_since, Some(now));
        assert_eq!(version, 1);
        assert_eq!(updated.session_version, 1);
    }

    #[tokio::test]
    async fn test_watermark_never_moves_backwards() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(record("a@x.com")).await.unwrap();
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(5);

        // Two racing changes land out of order
        store
            .update_password_hash(&created.id, "$argon2id$b".to_string(), later)
            .await
            .unwrap();
        let version = store
            .update_password_hash(&created.id, "$argon2id$a".to_string(), earlier)
            .await
            .unwrap();

        let updated = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(updated.valid_since, Some(later));
        assert_eq!(updated.password_hash, "$argon2id$a");
        assert_eq!(version, 2);
        assert_eq!(updated.session_version, 2);
    }

    #[tokio::test]
    async fn test_update_password_hash_unknown_user() {
        let store = InMemoryCredentialStore::new();

        let result = store
            .update_password_hash(&UserId::new(), "$argon2id$new".to_string(), Utc::now())
            .await;
        assert!(matches!(result, Err(CredentialStoreError::NotFound(_))));
    }
}
