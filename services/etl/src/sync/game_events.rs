use courtsync_common::error::EtlResult;
use courtsync_db::league::SyncTable;

use super::{advance_checkpoint, parse_checkpoint, Batch, SyncMode, SyncStores};

/// Events are insert-only for the reporting side, so a full-row upsert
/// is always safe. Reconciliation additionally deletes destination
/// events whose upstream counterpart disappeared; this is the one
/// place the sync processes upstream deletes.
pub(crate) async fn run(stores: &SyncStores<'_>, mode: &SyncMode) -> EtlResult<Batch> {
    let table = SyncTable::GameEvents;
    let last_id = parse_checkpoint(&stores.checkpoints.get(table.checkpoint_key()).await?)?;

    match mode {
        SyncMode::Incremental => {
            let rows = stores.source.game_events_after(last_id).await?;
            if rows.is_empty() {
                return Ok(Batch {
                    count: 0,
                    last_id,
                });
            }

            tracing::debug!(table = %table, last_id, fetched = rows.len(), "syncing");
            stores.dest.upsert_game_events(&rows).await?;

            let observed_max = rows.iter().map(|e| e.event_id).max().unwrap_or(last_id);
            let last_id =
                advance_checkpoint(stores.checkpoints, table, last_id, observed_max).await?;

            Ok(Batch {
                count: rows.len(),
                last_id,
            })
        }
        SyncMode::Reconcile(scope) => {
            let rows = stores.source.game_events_scoped(scope.as_deref()).await?;
            let keep: Vec<i32> = rows.iter().map(|e| e.event_id).collect();

            if !rows.is_empty() {
                stores.dest.upsert_game_events(&rows).await?;
            }

            // An empty fetch still reconciles: every destination event
            // in scope is an orphan then.
            let removed = stores
                .dest
                .delete_game_event_orphans(scope.as_deref(), &keep)
                .await?;
            if removed > 0 {
                tracing::info!(table = %table, removed, "reconciled upstream event deletions");
            }

            let observed_max = rows.iter().map(|e| e.event_id).max().unwrap_or(last_id);
            let last_id =
                advance_checkpoint(stores.checkpoints, table, last_id, observed_max).await?;

            Ok(Batch {
                count: rows.len(),
                last_id,
            })
        }
    }
}
