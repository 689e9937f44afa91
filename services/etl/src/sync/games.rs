use courtsync_common::error::EtlResult;
use courtsync_db::league::SyncTable;

use super::{advance_checkpoint, parse_checkpoint, Batch, SyncMode, SyncStores};

/// Games carry mutable columns (status, scores), so besides the
/// incremental copy they support a scoped full resync that re-reads
/// rows below the checkpoint. Games are never deleted downstream.
pub(crate) async fn run(stores: &SyncStores<'_>, mode: &SyncMode) -> EtlResult<Batch> {
    let table = SyncTable::Games;
    let last_id = parse_checkpoint(&stores.checkpoints.get(table.checkpoint_key()).await?)?;

    let rows = match mode {
        SyncMode::Incremental => stores.source.games_after(last_id).await?,
        SyncMode::Reconcile(scope) => stores.source.games_scoped(scope.as_deref()).await?,
    };

    if rows.is_empty() {
        return Ok(Batch {
            count: 0,
            last_id,
        });
    }

    tracing::debug!(table = %table, last_id, fetched = rows.len(), "syncing");
    stores.dest.upsert_games(&rows).await?;

    let observed_max = rows.iter().map(|g| g.game_id).max().unwrap_or(last_id);
    let last_id = advance_checkpoint(stores.checkpoints, table, last_id, observed_max).await?;

    Ok(Batch {
        count: rows.len(),
        last_id,
    })
}
