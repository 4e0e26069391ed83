//! SQLite-backed key-value store
//!
//! Expiry is stored as a unix timestamp and checked on read. Expired rows
//! are removed lazily, on the read that finds them and by [`SqliteKvStore::purge_expired`].

use async_trait::async_trait;
use chrono::Utc;
use sdk::collaborators::KvStore;
use sdk::errors::EngineError;
use sqlx::SqlitePool;

pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete every expired row, returning how many went
    pub async fn purge_expired(&self) -> Result<u64, EngineError> {
        let result = sqlx::query("DELETE FROM kv_cache WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

fn db_err(e: sqlx::Error) -> EngineError {
    EngineError::Database(e.to_string())
}

#[async_trait]
impl KvStore for SqliteKvStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        let row: Option<(Vec<u8>, i64)> =
            sqlx::query_as("SELECT value, expires_at FROM kv_cache WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        match row {
            Some((value, expires_at)) if expires_at > Utc::now().timestamp() => Ok(Some(value)),
            Some(_) => {
                sqlx::query("DELETE FROM kv_cache WHERE key = ?")
                    .bind(key)
                    .execute(&self.pool)
                    .await
                    .map_err(db_err)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
    ) -> Result<(), EngineError> {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl);

        sqlx::query(
            r#"
            INSERT INTO kv_cache (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
