use serde::Serialize;

use courtsync_db::league::destination::Destination;
use courtsync_db::league::source::LeagueSource;
use courtsync_db::league::SyncTable;

#[derive(Debug, Clone, Serialize)]
pub struct CountCheck {
    pub table: SyncTable,
    pub source_count: i64,
    pub destination_count: i64,
    pub matches: bool,
}

/// Post-cycle reconciliation report: row counts on both sides of every
/// synced table. Read-only and best-effort: a table that cannot be
/// counted is reported as a non-matching zero/zero pair and the rest
/// still run. Detects drift, never corrects it.
pub async fn validate_counts(
    source: &dyn LeagueSource,
    dest: &dyn Destination,
) -> Vec<CountCheck> {
    let mut results = Vec::with_capacity(SyncTable::ALL.len());

    for table in SyncTable::ALL {
        let check = match (source.count_rows(table).await, dest.count_rows(table).await) {
            (Ok(source_count), Ok(destination_count)) => CountCheck {
                table,
                source_count,
                destination_count,
                matches: source_count == destination_count,
            },
            (source_result, dest_result) => {
                let error = source_result
                    .err()
                    .or(dest_result.err())
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                tracing::error!(table = %table, error = %error, "count validation failed");
                CountCheck {
                    table,
                    source_count: 0,
                    destination_count: 0,
                    matches: false,
                }
            }
        };

        tracing::info!(
            table = %check.table,
            source = check.source_count,
            destination = check.destination_count,
            matches = check.matches,
            "count validation"
        );
        results.push(check);
    }

    let mismatched: Vec<&str> = results
        .iter()
        .filter(|c| !c.matches)
        .map(|c| c.table.as_str())
        .collect();
    if !mismatched.is_empty() {
        tracing::warn!(tables = ?mismatched, "row counts differ between source and destination");
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::*;
    use courtsync_db::league::SyncTable;

    #[tokio::test]
    async fn matching_counts_validate_clean() {
        let fx = Fixture::new();
        fx.source.teams.lock().unwrap().push(team(1, "Lions", "Metro"));
        fx.dest
            .teams
            .lock()
            .unwrap()
            .insert(1, team(1, "Lions", "Metro"));

        let results = validate_counts(&fx.source, &fx.dest).await;

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|c| c.matches));
    }

    #[tokio::test]
    async fn drift_is_reported_not_corrected() {
        let fx = Fixture::new();
        fx.source
            .teams
            .lock()
            .unwrap()
            .extend([team(1, "Lions", "Metro"), team(2, "Bears", "Hill")]);
        fx.dest
            .teams
            .lock()
            .unwrap()
            .insert(1, team(1, "Lions", "Metro"));

        let results = validate_counts(&fx.source, &fx.dest).await;

        let teams = results
            .iter()
            .find(|c| c.table == SyncTable::Teams)
            .unwrap();
        assert!(!teams.matches);
        assert_eq!(teams.source_count, 2);
        assert_eq!(teams.destination_count, 1);

        // Nothing was written to close the gap.
        assert_eq!(fx.dest.teams.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_count_does_not_abort_remaining_tables() {
        let fx = Fixture::new();
        fx.source.fail_table(SyncTable::Players);
        fx.source.games.lock().unwrap().push(game(1, "SCHEDULED"));
        fx.dest
            .games
            .lock()
            .unwrap()
            .insert(1, game(1, "SCHEDULED"));

        let results = validate_counts(&fx.source, &fx.dest).await;

        assert_eq!(results.len(), 4);
        let players = results
            .iter()
            .find(|c| c.table == SyncTable::Players)
            .unwrap();
        assert!(!players.matches);
        assert_eq!(players.source_count, 0);
        assert_eq!(players.destination_count, 0);

        let games = results
            .iter()
            .find(|c| c.table == SyncTable::Games)
            .unwrap();
        assert!(games.matches);
    }
}
