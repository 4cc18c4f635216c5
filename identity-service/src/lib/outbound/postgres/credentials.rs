use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::identity::errors::CredentialStoreError;
use crate::identity::models::CredentialRecord;
use crate::identity::models::EmailAddress;
use crate::identity::models::UserId;
use crate::identity::ports::CredentialStore;

const EMAIL_UNIQUE_CONSTRAINT: &str = "credentials_email_key";

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    valid_since: Option<DateTime<Utc>>,
    session_version: i64,
}

impl TryFrom<CredentialRow> for CredentialRecord {
    type Error = CredentialStoreError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::new(row.email)
            .map_err(|e| CredentialStoreError::Backend(format!("Corrupt email column: {}", e)))?;

        Ok(CredentialRecord {
            id: UserId(row.id),
            email,
            password_hash: row.password_hash,
            created_at: row.created_at,
            valid_since: row.valid_since,
            session_version: row.session_version,
        })
    }
}

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema migrations shipped with this crate.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, email, password_hash, created_at, valid_since, session_version
            FROM credentials
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialStoreError::Backend(e.to_string()))?;

        row.map(CredentialRecord::try_from).transpose()
    }

    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, email, password_hash, created_at, valid_since, session_version
            FROM credentials
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialStoreError::Backend(e.to_string()))?;

        row.map(CredentialRecord::try_from).transpose()
    }

    async fn create(
        &self,
        record: CredentialRecord,
    ) -> Result<CredentialRecord, CredentialStoreError> {
        sqlx::query(
            r#"
            INSERT INTO credentials
                (id, email, password_hash, created_at, valid_since, session_version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.0)
        .bind(record.email.as_str())
        .bind(&record.password_hash)
        .bind(record.created_at)
        .bind(record.valid_since)
        .bind(record.session_version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT)
                {
                    return CredentialStoreError::DuplicateEmail(
                        record.email.as_str().to_string(),
                    );
                }
            }
            CredentialStoreError::Backend(e.to_string())
        })?;

        Ok(record)
    }

    async fn update_password_hash(
        &self,
        id: &UserId,
        password_hash: String,
        valid_since: DateTime<Utc>,
    ) -> Result<i64, CredentialStoreError> {
        // GREATEST skips NULL, so the first change sets the watermark
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE credentials
            SET password_hash = $2,
                valid_since = GREATEST(valid_since, $3),
                session_version = session_version + 1
            WHERE id = $1
            RETURNING session_version
            "#,
        )
        .bind(id.0)
        .bind(password_hash)
        .bind(valid_since)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialStoreError::Backend(e.to_string()))?;

        version.ok_or_else(|| CredentialStoreError::NotFound(id.to_string()))
    }
}
