use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use courtsync_config::AppConfig;
use courtsync_db::checkpoint::PgCheckpointStore;
use courtsync_db::league::destination::PgDestination;
use courtsync_db::league::source::PgLeagueSource;
use courtsync_db::runlog::PgRunLog;
use courtsync_db::{open_pool, RetryPolicy};

use crate::sync::{run_cycle, SyncOutcome, SyncStores};
use crate::validate::validate_counts;

/// Single-worker periodic sync: one cycle runs to completion through
/// all four tables before the loop sleeps again; cycles never overlap.
pub struct Orchestrator {
    config: AppConfig,
}

impl Orchestrator {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.max_retries,
            delay: Duration::from_secs(self.config.retry_delay_secs),
        }
    }

    /// One complete cycle: connect, sync every table, validate when
    /// anything moved, and always release both connection pools.
    /// Returns `false` when connecting failed or any table errored.
    /// Callers only log the result; the schedule does not change.
    pub async fn run_once(&self) -> bool {
        let started = Instant::now();
        tracing::info!("sync cycle starting");

        let policy = self.retry_policy();
        let source_pool = match open_pool("source", &self.config.source_database_url, &policy).await
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!(error = %e, "cycle skipped: source unreachable");
                return false;
            }
        };
        let dest_pool = match open_pool("destination", &self.config.database_url, &policy).await {
            Ok(pool) => pool,
            Err(e) => {
                source_pool.close().await;
                tracing::error!(error = %e, "cycle skipped: destination unreachable");
                return false;
            }
        };

        let source = PgLeagueSource::new(source_pool.clone());
        let dest = PgDestination::new(dest_pool.clone());
        let checkpoints = PgCheckpointStore::new(dest_pool.clone());
        let audit = PgRunLog::new(dest_pool.clone());
        let stores = SyncStores {
            source: &source,
            dest: &dest,
            checkpoints: &checkpoints,
            audit: &audit,
        };

        // run_cycle contains per-table failures; nothing between here
        // and the close calls below returns early.
        let outcomes = run_cycle(&stores).await;
        let total: usize = outcomes.iter().map(|o| o.count).sum();
        log_summary(&outcomes, total);

        if total > 0 {
            validate_counts(&source, &dest).await;
        }

        source_pool.close().await;
        dest_pool.close().await;

        let ok = !outcomes.iter().any(SyncOutcome::is_error);
        tracing::info!(
            total,
            ok,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "sync cycle finished"
        );
        ok
    }

    /// Fixed-interval polling loop. The first tick fires immediately;
    /// an interrupt is honored between cycles, never mid-cycle.
    pub async fn run_loop(&self) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.sync_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, stopping sync loop");
                    break;
                }
            }
        }
    }
}

fn log_summary(outcomes: &[SyncOutcome], total: usize) {
    for outcome in outcomes {
        if outcome.is_error() {
            tracing::error!(
                table = %outcome.table,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "table sync ended in error"
            );
        } else if outcome.count > 0 {
            tracing::info!(
                table = %outcome.table,
                count = outcome.count,
                duration_secs = outcome.duration_seconds,
                last_id = outcome.last_id,
                "table synced"
            );
        }
    }
    tracing::info!(total, "cycle rows copied");
}
