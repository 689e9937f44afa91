use async_trait::async_trait;
use sqlx::{PgPool, Row};

use courtsync_common::error::{EtlError, EtlResult};

use crate::league::models::{Game, GameEvent, Player, Team};
use crate::league::SyncTable;

/// Write side of the report store. Each upsert batch runs in one
/// transaction; insert-or-update is keyed by the upstream primary key,
/// so re-applying a batch is idempotent.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn upsert_teams(&self, rows: &[Team]) -> EtlResult<()>;
    async fn upsert_players(&self, rows: &[Player]) -> EtlResult<()>;
    async fn upsert_games(&self, rows: &[Game]) -> EtlResult<()>;
    async fn upsert_game_events(&self, rows: &[GameEvent]) -> EtlResult<()>;

    /// Delete events whose source counterpart disappeared. Scoped to
    /// the given games, or global when `game_ids` is `None`. Returns
    /// the number of rows removed.
    async fn delete_game_event_orphans(
        &self,
        game_ids: Option<&[i32]>,
        keep_event_ids: &[i32],
    ) -> EtlResult<u64>;

    async fn count_rows(&self, table: SyncTable) -> EtlResult<i64>;
}

#[derive(Clone)]
pub struct PgDestination {
    pool: PgPool,
}

impl PgDestination {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Destination for PgDestination {
    async fn upsert_teams(&self, rows: &[Team]) -> EtlResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        for team in rows {
            sqlx::query(
                "insert into teams (team_id, name, city, logo_url, created_at)
                 values ($1, $2, $3, $4, $5)
                 on conflict (team_id) do update set
                   name = excluded.name,
                   city = excluded.city,
                   logo_url = excluded.logo_url",
            )
            .bind(team.team_id)
            .bind(&team.name)
            .bind(&team.city)
            .bind(&team.logo_url)
            .bind(team.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))
    }

    async fn upsert_players(&self, rows: &[Player]) -> EtlResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        for player in rows {
            sqlx::query(
                "insert into players (player_id, team_id, number, name, position, active, created_at)
                 values ($1, $2, $3, $4, $5, $6, $7)
                 on conflict (player_id) do update set
                   team_id = excluded.team_id,
                   number = excluded.number,
                   name = excluded.name,
                   position = excluded.position,
                   active = excluded.active",
            )
            .bind(player.player_id)
            .bind(player.team_id)
            .bind(player.number)
            .bind(&player.name)
            .bind(&player.position)
            .bind(player.active)
            .bind(player.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))
    }

    async fn upsert_games(&self, rows: &[Game]) -> EtlResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        // Two-writer guard: the reporting side mutates quarter, scores
        // and status on destination rows directly. Those four columns
        // follow the source only while the destination row is still
        // SCHEDULED; afterwards the destination is authoritative for
        // them and only the descriptive columns are refreshed.
        for game in rows {
            sqlx::query(
                "insert into games (game_id, home_team, away_team, home_team_id, away_team_id,
                                    quarter, home_score, away_score, status, created_at)
                 values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 on conflict (game_id) do update set
                   home_team = excluded.home_team,
                   away_team = excluded.away_team,
                   home_team_id = excluded.home_team_id,
                   away_team_id = excluded.away_team_id,
                   quarter = case when games.status = 'SCHEDULED'
                                  then excluded.quarter else games.quarter end,
                   home_score = case when games.status = 'SCHEDULED'
                                     then excluded.home_score else games.home_score end,
                   away_score = case when games.status = 'SCHEDULED'
                                     then excluded.away_score else games.away_score end,
                   status = case when games.status = 'SCHEDULED'
                                 then excluded.status else games.status end",
            )
            .bind(game.game_id)
            .bind(&game.home_team)
            .bind(&game.away_team)
            .bind(game.home_team_id)
            .bind(game.away_team_id)
            .bind(game.quarter)
            .bind(game.home_score)
            .bind(game.away_score)
            .bind(&game.status)
            .bind(game.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))
    }

    async fn upsert_game_events(&self, rows: &[GameEvent]) -> EtlResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        for event in rows {
            sqlx::query(
                "insert into game_events (event_id, game_id, quarter, team, event_type,
                                          player_number, player_id, foul_type, created_at)
                 values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 on conflict (event_id) do update set
                   game_id = excluded.game_id,
                   quarter = excluded.quarter,
                   team = excluded.team,
                   event_type = excluded.event_type,
                   player_number = excluded.player_number,
                   player_id = excluded.player_id,
                   foul_type = excluded.foul_type",
            )
            .bind(event.event_id)
            .bind(event.game_id)
            .bind(event.quarter)
            .bind(&event.team)
            .bind(&event.event_type)
            .bind(event.player_number)
            .bind(event.player_id)
            .bind(&event.foul_type)
            .bind(event.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::Database(e.to_string()))
    }

    async fn delete_game_event_orphans(
        &self,
        game_ids: Option<&[i32]>,
        keep_event_ids: &[i32],
    ) -> EtlResult<u64> {
        let result = match game_ids {
            Some(ids) => {
                sqlx::query(
                    "delete from game_events
                     where game_id = any($1) and not (event_id = any($2))",
                )
                .bind(ids.to_vec())
                .bind(keep_event_ids.to_vec())
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query("delete from game_events where not (event_id = any($1))")
                    .bind(keep_event_ids.to_vec())
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn count_rows(&self, table: SyncTable) -> EtlResult<i64> {
        let sql = match table {
            SyncTable::Teams => "select count(*) from teams",
            SyncTable::Players => "select count(*) from players",
            SyncTable::Games => "select count(*) from games",
            SyncTable::GameEvents => "select count(*) from game_events",
        };

        let row = sqlx::query(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(row.get::<i64, _>(0))
    }
}
