//! SQLite credential store.
//!
//! Implements `CredentialStore` from `wagate-core` using sqlx with the
//! split read/write pool. One row per (instance, key); values are JSON
//! text. The records survive process restarts, so a paired device keeps
//! its session across deploys; deleting an instance's rows forgets the
//! pairing entirely.

use chrono::Utc;
use sqlx::Row;

use wagate_core::credential::{CredentialRecord, CredentialStore, Credentials};
use wagate_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CredentialStore`.
pub struct SqliteCredentialStore {
    pool: DatabasePool,
}

impl SqliteCredentialStore {
    /// Create a new credential store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for SqliteCredentialStore {
    async fn load(&self, instance_id: &str) -> Result<Credentials, StoreError> {
        let rows = sqlx::query("SELECT key, value FROM instance_credentials WHERE instance_id = ?")
            .bind(instance_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut credentials = Credentials::empty();
        for row in &rows {
            let key: String = row
                .try_get("key")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            let value_str: String = row
                .try_get("value")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            let value: serde_json::Value = serde_json::from_str(&value_str)
                .map_err(|e| StoreError::Query(format!("invalid JSON value: {e}")))?;
            credentials.records.insert(key, value);
        }

        Ok(credentials)
    }

    async fn persist(
        &self,
        instance_id: &str,
        records: &[CredentialRecord],
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        for record in records {
            let value_str = serde_json::to_string(&record.value)
                .map_err(|e| StoreError::Query(format!("failed to serialize value: {e}")))?;

            sqlx::query(
                r#"INSERT INTO instance_credentials (instance_id, key, value, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT (instance_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            )
            .bind(instance_id)
            .bind(&record.key)
            .bind(&value_str)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        }

        Ok(())
    }

    async fn wipe(&self, instance_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM instance_credentials WHERE instance_id = ?")
            .bind(instance_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }
}
