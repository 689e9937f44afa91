use courtsync_common::error::EtlResult;
use courtsync_db::league::SyncTable;

use super::{advance_checkpoint, parse_checkpoint, Batch, SyncStores};

pub(crate) async fn run(stores: &SyncStores<'_>) -> EtlResult<Batch> {
    let table = SyncTable::Players;
    let last_id = parse_checkpoint(&stores.checkpoints.get(table.checkpoint_key()).await?)?;

    let rows = stores.source.players_after(last_id).await?;
    if rows.is_empty() {
        return Ok(Batch {
            count: 0,
            last_id,
        });
    }

    tracing::debug!(table = %table, last_id, fetched = rows.len(), "syncing");
    stores.dest.upsert_players(&rows).await?;

    let observed_max = rows.iter().map(|p| p.player_id).max().unwrap_or(last_id);
    let last_id = advance_checkpoint(stores.checkpoints, table, last_id, observed_max).await?;

    Ok(Batch {
        count: rows.len(),
        last_id,
    })
}
