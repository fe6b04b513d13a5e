use crate::domain::ports::KeyValueStore;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool, Transaction};

pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const UPSERT: &str = "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

async fn upsert(tx: &mut Transaction<'_, Sqlite>, key: &str, value: &Value) -> Result<(), AppError> {
    sqlx::query(UPSERT)
        .bind(key)
        .bind(value.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| AppError::Persistence(format!("{}: {}", key, e)))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        upsert(&mut tx, key, value).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        for (key, value) in entries {
            upsert(&mut tx, key, value).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
