pub mod game_events;
pub mod games;
pub mod players;
pub mod teams;

use std::time::Instant;

use serde::Serialize;

use courtsync_common::error::{EtlError, EtlResult};
use courtsync_db::checkpoint::CheckpointStore;
use courtsync_db::league::destination::Destination;
use courtsync_db::league::source::LeagueSource;
use courtsync_db::league::SyncTable;
use courtsync_db::runlog::{RunLog, RunStatus};

/// The stores one sync invocation works against. The periodic loop and
/// the on-demand trigger each build their own set from their own
/// connections.
pub struct SyncStores<'a> {
    pub source: &'a dyn LeagueSource,
    pub dest: &'a dyn Destination,
    pub checkpoints: &'a dyn CheckpointStore,
    pub audit: &'a dyn RunLog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// Copy rows with primary key above the stored checkpoint.
    Incremental,
    /// Copy everything, optionally restricted to a set of games,
    /// reconciling event deletions. Ignores the checkpoint as an input
    /// but still advances it to the maximum key observed.
    Reconcile(Option<Vec<i32>>),
}

/// Per-invocation result, aggregated into the cycle summary or the
/// on-demand response.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub table: SyncTable,
    pub count: usize,
    pub duration_seconds: f64,
    pub last_id: i32,
    pub status: RunStatus,
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn is_error(&self) -> bool {
        self.status == RunStatus::Error
    }
}

pub(crate) struct Batch {
    pub count: usize,
    pub last_id: i32,
}

pub(crate) fn parse_checkpoint(raw: &str) -> EtlResult<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| EtlError::Internal(format!("malformed checkpoint value: {raw:?}")))
}

/// Advance the checkpoint only when the batch moved past it. Scoped
/// reconciliation can observe a maximum below the stored watermark;
/// the watermark never regresses.
pub(crate) async fn advance_checkpoint(
    checkpoints: &dyn CheckpointStore,
    table: SyncTable,
    previous: i32,
    observed_max: i32,
) -> EtlResult<i32> {
    if observed_max <= previous {
        return Ok(previous);
    }
    checkpoints
        .set(table.checkpoint_key(), &observed_max.to_string())
        .await?;
    Ok(observed_max)
}

/// Run one table sync to completion. Never returns an error: failures
/// are recorded in the run log and reported as an ERROR outcome,
/// bounded to this one table.
pub async fn sync_table(stores: &SyncStores<'_>, table: SyncTable, mode: &SyncMode) -> SyncOutcome {
    let started = Instant::now();

    let result = match table {
        SyncTable::Teams => teams::run(stores).await,
        SyncTable::Players => players::run(stores).await,
        SyncTable::Games => games::run(stores, mode).await,
        SyncTable::GameEvents => game_events::run(stores, mode).await,
    };

    let duration = round2(started.elapsed().as_secs_f64());

    match result {
        Ok(batch) => {
            stores
                .audit
                .append(
                    table.as_str(),
                    RunStatus::Success,
                    batch.count as i32,
                    duration,
                    None,
                )
                .await;
            SyncOutcome {
                table,
                count: batch.count,
                duration_seconds: duration,
                last_id: batch.last_id,
                status: RunStatus::Success,
                error: None,
            }
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(table = %table, error = %message, "table sync failed");
            stores
                .audit
                .append(table.as_str(), RunStatus::Error, 0, duration, Some(&message))
                .await;
            SyncOutcome {
                table,
                count: 0,
                duration_seconds: duration,
                last_id: 0,
                status: RunStatus::Error,
                error: Some(message),
            }
        }
    }
}

/// One full pass over all four tables in dependency order. A failed
/// table never stops the ones after it.
pub async fn run_cycle(stores: &SyncStores<'_>) -> Vec<SyncOutcome> {
    let mut outcomes = Vec::with_capacity(SyncTable::ALL.len());
    for table in SyncTable::ALL {
        outcomes.push(sync_table(stores, table, &SyncMode::Incremental).await);
    }
    outcomes
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    // ── Incremental protocol ────────────────────────────────────

    #[tokio::test]
    async fn first_teams_sync_copies_everything_and_sets_checkpoint() {
        let fx = Fixture::new();
        fx.source
            .teams
            .lock()
            .unwrap()
            .extend([team(1, "Lions", "Metro"), team(2, "Bears", "Hill")]);

        let outcome = sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.last_id, 2);
        assert_eq!(fx.checkpoint(SyncTable::Teams), "2");
        assert_eq!(fx.dest.teams.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_sync_skips_rows_at_or_below_checkpoint() {
        let fx = Fixture::new();
        fx.source
            .teams
            .lock()
            .unwrap()
            .extend([team(1, "Lions", "Metro"), team(2, "Bears", "Hill")]);

        sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        // New row plus an in-place change to an already-synced row.
        fx.source.teams.lock().unwrap().push(team(3, "Wolves", "Bay"));
        fx.source.teams.lock().unwrap()[0].city = Some("Central".to_owned());

        let outcome = sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.last_id, 3);
        assert_eq!(fx.checkpoint(SyncTable::Teams), "3");

        // Incremental mode never re-fetches ids at or below the
        // checkpoint, so the earlier city edit stays stale downstream.
        let dest = fx.dest.teams.lock().unwrap();
        assert_eq!(dest[&1].city.as_deref(), Some("Metro"));
        assert_eq!(dest[&3].name, "Wolves");
    }

    #[tokio::test]
    async fn sync_with_no_new_rows_is_a_zero_count_success() {
        let fx = Fixture::new();
        fx.source.teams.lock().unwrap().push(team(1, "Lions", "Metro"));

        sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;
        let before = fx.dest.teams.lock().unwrap().clone();

        let outcome = sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.last_id, 1);
        assert_eq!(fx.checkpoint(SyncTable::Teams), "1");
        assert_eq!(*fx.dest.teams.lock().unwrap(), before);
    }

    #[tokio::test]
    async fn checkpoint_is_monotonic_across_runs() {
        let fx = Fixture::new();

        for batch in [vec![team(3, "A", "a")], vec![team(7, "B", "b")], vec![]] {
            fx.source.teams.lock().unwrap().extend(batch);
            sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;
        }

        assert_eq!(fx.checkpoint(SyncTable::Teams), "7");
    }

    #[tokio::test]
    async fn incremental_fetches_use_the_stored_watermark() {
        let fx = Fixture::new();
        fx.source
            .players
            .lock()
            .unwrap()
            .extend([player(1, 1, "Ada"), player(2, 1, "Ben")]);

        sync_table(&fx.stores(), SyncTable::Players, &SyncMode::Incremental).await;
        sync_table(&fx.stores(), SyncTable::Players, &SyncMode::Incremental).await;

        // First fetch starts from zero, second from the advanced
        // checkpoint; rows at or below it are never requested again.
        assert_eq!(fx.source.fetched_watermarks(SyncTable::Players), vec![0, 2]);
    }

    #[tokio::test]
    async fn run_log_records_success_with_counts() {
        let fx = Fixture::new();
        fx.source.teams.lock().unwrap().push(team(1, "Lions", "Metro"));

        sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        let entries = fx.audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].table, "teams");
        assert_eq!(entries[0].status, RunStatus::Success);
        assert_eq!(entries[0].records, 1);
        assert!(entries[0].error.is_none());
    }

    // ── Error isolation ─────────────────────────────────────────

    #[tokio::test]
    async fn source_failure_produces_error_outcome_and_log_entry() {
        let fx = Fixture::new();
        fx.source.fail_table(SyncTable::Teams);

        let outcome = sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        assert!(outcome.is_error());
        assert_eq!(outcome.count, 0);
        assert!(outcome.error.as_deref().unwrap().contains("injected"));

        let entries = fx.audit.entries.lock().unwrap();
        assert_eq!(entries[0].status, RunStatus::Error);
        assert!(entries[0].error.is_some());
    }

    #[tokio::test]
    async fn failed_upsert_leaves_checkpoint_untouched() {
        let fx = Fixture::new();
        fx.source.teams.lock().unwrap().push(team(1, "Lions", "Metro"));
        fx.dest.fail.lock().unwrap().insert(SyncTable::Teams);

        let outcome = sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        assert!(outcome.is_error());
        assert_eq!(fx.checkpoint(SyncTable::Teams), "0");
    }

    #[tokio::test]
    async fn one_failing_table_does_not_stop_the_cycle() {
        let fx = Fixture::new();
        fx.source.teams.lock().unwrap().push(team(1, "Lions", "Metro"));
        fx.source.players.lock().unwrap().push(player(1, 1, "Ada"));
        fx.source.games.lock().unwrap().push(game(1, "SCHEDULED"));
        fx.source.events.lock().unwrap().push(event(1, 1));
        fx.source.fail_table(SyncTable::Players);

        let outcomes = run_cycle(&fx.stores()).await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].status, RunStatus::Success);
        assert!(outcomes[1].is_error());
        assert_eq!(outcomes[2].status, RunStatus::Success);
        assert_eq!(outcomes[3].status, RunStatus::Success);

        // Downstream tables after the failed one still synced.
        assert_eq!(fx.dest.games.lock().unwrap().len(), 1);
        assert_eq!(fx.dest.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_checkpoint_is_an_isolated_table_error() {
        let fx = Fixture::new();
        fx.checkpoints
            .map
            .lock()
            .unwrap()
            .insert("teams_last_id".to_owned(), "not-a-number".to_owned());

        let outcome = sync_table(&fx.stores(), SyncTable::Teams, &SyncMode::Incremental).await;

        assert!(outcome.is_error());
        assert!(outcome.error.as_deref().unwrap().contains("checkpoint"));
    }

    // ── Scoped reconciliation ───────────────────────────────────

    #[tokio::test]
    async fn scoped_game_resync_refreshes_changed_rows() {
        let fx = Fixture::new();
        fx.source.games.lock().unwrap().push(game(1, "SCHEDULED"));

        sync_table(&fx.stores(), SyncTable::Games, &SyncMode::Incremental).await;

        // Upstream finishes the game; the id is below the checkpoint,
        // so only a scoped resync can pick the change up.
        fx.source.games.lock().unwrap()[0].status = "FINISHED".to_owned();

        let outcome = sync_table(
            &fx.stores(),
            SyncTable::Games,
            &SyncMode::Reconcile(Some(vec![1])),
        )
        .await;

        assert_eq!(outcome.count, 1);
        assert_eq!(fx.dest.games.lock().unwrap()[&1].status, "FINISHED");
        assert_eq!(fx.dest.games.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scoped_event_resync_deletes_only_in_scope_orphans() {
        let fx = Fixture::new();
        // Game 1 has events 10 and 11, game 2 has event 20; all synced.
        fx.source
            .events
            .lock()
            .unwrap()
            .extend([event(10, 1), event(11, 1), event(20, 2)]);
        sync_table(&fx.stores(), SyncTable::GameEvents, &SyncMode::Incremental).await;

        // Event 11 is deleted upstream, and so is game 2's event 20,
        // but only game 1 is in scope.
        fx.source
            .events
            .lock()
            .unwrap()
            .retain(|e| e.event_id == 10);

        let outcome = sync_table(
            &fx.stores(),
            SyncTable::GameEvents,
            &SyncMode::Reconcile(Some(vec![1])),
        )
        .await;

        assert_eq!(outcome.status, RunStatus::Success);
        let dest = fx.dest.events.lock().unwrap();
        assert!(dest.contains_key(&10));
        assert!(!dest.contains_key(&11), "in-scope orphan should be deleted");
        assert!(dest.contains_key(&20), "out-of-scope event must be untouched");
    }

    #[tokio::test]
    async fn unscoped_event_resync_reconciles_globally() {
        let fx = Fixture::new();
        fx.source
            .events
            .lock()
            .unwrap()
            .extend([event(10, 1), event(20, 2)]);
        sync_table(&fx.stores(), SyncTable::GameEvents, &SyncMode::Incremental).await;

        fx.source.events.lock().unwrap().clear();

        sync_table(&fx.stores(), SyncTable::GameEvents, &SyncMode::Reconcile(None)).await;

        assert!(fx.dest.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scoped_resync_never_regresses_the_checkpoint() {
        let fx = Fixture::new();
        fx.source
            .games
            .lock()
            .unwrap()
            .extend([game(1, "FINISHED"), game(8, "SCHEDULED")]);
        sync_table(&fx.stores(), SyncTable::Games, &SyncMode::Incremental).await;
        assert_eq!(fx.checkpoint(SyncTable::Games), "8");

        // Scope covers only game 1; the max observed key (1) is below
        // the stored watermark and must not pull it backwards.
        sync_table(
            &fx.stores(),
            SyncTable::Games,
            &SyncMode::Reconcile(Some(vec![1])),
        )
        .await;

        assert_eq!(fx.checkpoint(SyncTable::Games), "8");
    }

    #[tokio::test]
    async fn reconcile_advances_checkpoint_past_new_rows() {
        let fx = Fixture::new();
        fx.source.games.lock().unwrap().push(game(5, "SCHEDULED"));

        let outcome = sync_table(
            &fx.stores(),
            SyncTable::Games,
            &SyncMode::Reconcile(Some(vec![5])),
        )
        .await;

        assert_eq!(outcome.last_id, 5);
        assert_eq!(fx.checkpoint(SyncTable::Games), "5");
    }

    #[tokio::test]
    async fn games_are_never_deleted_by_reconciliation() {
        let fx = Fixture::new();
        fx.source.games.lock().unwrap().push(game(1, "SCHEDULED"));
        sync_table(&fx.stores(), SyncTable::Games, &SyncMode::Incremental).await;

        // Game vanishes upstream; reconciliation must leave the copy.
        fx.source.games.lock().unwrap().clear();
        let outcome =
            sync_table(&fx.stores(), SyncTable::Games, &SyncMode::Reconcile(None)).await;

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.count, 0);
        assert_eq!(fx.dest.games.lock().unwrap().len(), 1);
    }
}
