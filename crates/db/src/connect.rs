use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use courtsync_common::error::{EtlError, EtlResult};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded connection retry: fixed delay between attempts, terminal
/// error once attempts are exhausted.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Open a Postgres pool, retrying per the given policy.
///
/// `label` names the endpoint ("source" / "destination") in logs and
/// error messages.
pub async fn open_pool(label: &str, url: &str, policy: &RetryPolicy) -> EtlResult<PgPool> {
    if url.is_empty() {
        return Err(EtlError::Config(format!(
            "{label} connection string is not configured"
        )));
    }

    let mut last_error = String::new();
    for attempt in 1..=policy.max_attempts.max(1) {
        match PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
        {
            Ok(pool) => {
                tracing::info!(label, attempt, "database connection established");
                return Ok(pool);
            }
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(
                    label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %last_error,
                    "connection attempt failed"
                );
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(EtlError::Connection(format!(
        "{label}: giving up after {} attempts: {last_error}",
        policy.max_attempts.max(1)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_pool_rejects_empty_url() {
        let result = open_pool("source", "", &RetryPolicy::immediate(1)).await;
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[tokio::test]
    async fn open_pool_exhausts_retries_on_unreachable_host() {
        let result = open_pool(
            "destination",
            "postgres://nobody@127.0.0.1:1/nonexistent",
            &RetryPolicy::immediate(2),
        )
        .await;

        match result {
            Err(EtlError::Connection(msg)) => assert!(msg.contains("2 attempts")),
            other => panic!("expected connection error, got {other:?}"),
        }
    }
}
