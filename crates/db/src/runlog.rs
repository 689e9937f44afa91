use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Error => "ERROR",
        }
    }
}

/// Append-only audit trail of sync attempts.
///
/// Writes are best-effort: a failure to record an attempt must never
/// fail the sync that produced it, so `append` does not return a
/// result.
#[async_trait]
pub trait RunLog: Send + Sync {
    async fn append(
        &self,
        table_name: &str,
        status: RunStatus,
        records_processed: i32,
        duration_seconds: f64,
        error_message: Option<&str>,
    );
}

#[derive(Clone)]
pub struct PgRunLog {
    pool: PgPool,
}

impl PgRunLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunLog for PgRunLog {
    async fn append(
        &self,
        table_name: &str,
        status: RunStatus,
        records_processed: i32,
        duration_seconds: f64,
        error_message: Option<&str>,
    ) {
        let result = sqlx::query(
            "insert into etl_logs
               (table_name, status, records_processed, duration_seconds, error_message, executed_at)
             values ($1, $2, $3, $4, $5, $6)",
        )
        .bind(table_name)
        .bind(status.as_str())
        .bind(records_processed)
        .bind(duration_seconds)
        .bind(error_message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(table = table_name, error = %e, "failed to write run log entry");
        }
    }
}
