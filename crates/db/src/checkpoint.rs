use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};

use courtsync_common::error::{EtlError, EtlResult};

/// Per-table sync watermark, persisted in the destination store.
///
/// Keys follow the `"<table>_last_id"` convention; a missing row reads
/// as `"0"` (nothing processed yet).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, key: &str) -> EtlResult<String>;

    /// Atomic upsert stamping `updated_at`. Durable once this returns;
    /// callers invoke it only after the matching row batch committed.
    async fn set(&self, key: &str, value: &str) -> EtlResult<()>;
}

#[derive(Clone)]
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn get(&self, key: &str) -> EtlResult<String> {
        let row = sqlx::query("select checkpoint_value from etl_state where checkpoint_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(row
            .map(|r| r.get("checkpoint_value"))
            .unwrap_or_else(|| "0".to_owned()))
    }

    async fn set(&self, key: &str, value: &str) -> EtlResult<()> {
        sqlx::query(
            "insert into etl_state (checkpoint_key, checkpoint_value, updated_at)
             values ($1, $2, $3)
             on conflict (checkpoint_key)
             do update set checkpoint_value = excluded.checkpoint_value,
                           updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(())
    }
}
