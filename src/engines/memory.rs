//! Postgres-backed key-value memory.
//!
//! Rows live in the `memory` table keyed by (tenant_id, key). Expired rows
//! are swept opportunistically on access rather than by a background job.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::{db::DbPool, error::AppError};

use super::MemoryStore;

pub struct PostgresMemoryStore {
    pool: DbPool,
}

impl PostgresMemoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn sweep_expired(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM memory WHERE expires_at IS NOT NULL AND expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for PostgresMemoryStore {
    async fn set(
        &self,
        tenant_id: &str,
        key: &str,
        value: &Value,
        session_id: Option<&str>,
        ttl_seconds: Option<i64>,
    ) -> Result<(), AppError> {
        self.sweep_expired().await?;

        let expires_at = ttl_seconds.map(|seconds| Utc::now() + Duration::seconds(seconds));

        sqlx::query(
            r#"
            INSERT INTO memory (tenant_id, key, value, session_id, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id, key) DO UPDATE SET
                value = EXCLUDED.value,
                session_id = EXCLUDED.session_id,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(tenant_id)
        .bind(key)
        .bind(value)
        .bind(session_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, tenant_id: &str, key: &str) -> Result<Option<Value>, AppError> {
        self.sweep_expired().await?;

        let value = sqlx::query_scalar::<_, Option<Value>>(
            "SELECT value FROM memory WHERE tenant_id = $1 AND key = $2",
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.flatten())
    }

    async fn keys(&self, tenant_id: &str) -> Result<Vec<String>, AppError> {
        self.sweep_expired().await?;

        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM memory WHERE tenant_id = $1 ORDER BY key",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn delete(&self, tenant_id: &str, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM memory WHERE tenant_id = $1 AND key = $2")
            .bind(tenant_id)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
