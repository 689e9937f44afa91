use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use courtsync_common::error::{EtlError, EtlResult};

use crate::league::models::{Game, GameEvent, Player, Team};
use crate::league::SyncTable;

/// Read-only view of the upstream operational database.
///
/// Incremental fetches return rows with primary key strictly above the
/// given watermark, ordered ascending by primary key; checkpoint
/// advancement relies on that ordering. Scoped fetches ignore the
/// watermark and optionally restrict to a set of game ids.
#[async_trait]
pub trait LeagueSource: Send + Sync {
    async fn teams_after(&self, last_id: i32) -> EtlResult<Vec<Team>>;
    async fn players_after(&self, last_id: i32) -> EtlResult<Vec<Player>>;
    async fn games_after(&self, last_id: i32) -> EtlResult<Vec<Game>>;
    async fn game_events_after(&self, last_id: i32) -> EtlResult<Vec<GameEvent>>;

    async fn games_scoped(&self, game_ids: Option<&[i32]>) -> EtlResult<Vec<Game>>;
    async fn game_events_scoped(&self, game_ids: Option<&[i32]>) -> EtlResult<Vec<GameEvent>>;

    async fn count_rows(&self, table: SyncTable) -> EtlResult<i64>;
}

#[derive(Clone)]
pub struct PgLeagueSource {
    pool: PgPool,
}

impl PgLeagueSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_team(row: PgRow) -> Team {
        Team {
            team_id: row.get("team_id"),
            name: row.get("name"),
            city: row.get("city"),
            logo_url: row.get("logo_url"),
            created_at: row.get("created_at"),
        }
    }

    fn map_player(row: PgRow) -> Player {
        Player {
            player_id: row.get("player_id"),
            team_id: row.get("team_id"),
            number: row.get("number"),
            name: row.get("name"),
            position: row.get("position"),
            active: row.get("active"),
            created_at: row.get("created_at"),
        }
    }

    fn map_game(row: PgRow) -> Game {
        Game {
            game_id: row.get("game_id"),
            home_team: row.get("home_team"),
            away_team: row.get("away_team"),
            home_team_id: row.get("home_team_id"),
            away_team_id: row.get("away_team_id"),
            quarter: row.get("quarter"),
            home_score: row.get("home_score"),
            away_score: row.get("away_score"),
            status: row.get("status"),
            created_at: row.get("created_at"),
        }
    }

    fn map_event(row: PgRow) -> GameEvent {
        GameEvent {
            event_id: row.get("event_id"),
            game_id: row.get("game_id"),
            quarter: row.get("quarter"),
            team: row.get("team"),
            event_type: row.get("event_type"),
            player_number: row.get("player_number"),
            player_id: row.get("player_id"),
            foul_type: row.get("foul_type"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl LeagueSource for PgLeagueSource {
    async fn teams_after(&self, last_id: i32) -> EtlResult<Vec<Team>> {
        let rows = sqlx::query(
            "select team_id, name, city, logo_url, created_at
             from teams where team_id > $1 order by team_id",
        )
        .bind(last_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_team).collect())
    }

    async fn players_after(&self, last_id: i32) -> EtlResult<Vec<Player>> {
        let rows = sqlx::query(
            "select player_id, team_id, number, name, position, active, created_at
             from players where player_id > $1 order by player_id",
        )
        .bind(last_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_player).collect())
    }

    async fn games_after(&self, last_id: i32) -> EtlResult<Vec<Game>> {
        let rows = sqlx::query(
            "select game_id, home_team, away_team, home_team_id, away_team_id,
                    quarter, home_score, away_score, status, created_at
             from games where game_id > $1 order by game_id",
        )
        .bind(last_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_game).collect())
    }

    async fn game_events_after(&self, last_id: i32) -> EtlResult<Vec<GameEvent>> {
        let rows = sqlx::query(
            "select event_id, game_id, quarter, team, event_type,
                    player_number, player_id, foul_type, created_at
             from game_events where event_id > $1 order by event_id",
        )
        .bind(last_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_event).collect())
    }

    async fn games_scoped(&self, game_ids: Option<&[i32]>) -> EtlResult<Vec<Game>> {
        let query = match game_ids {
            Some(ids) => sqlx::query(
                "select game_id, home_team, away_team, home_team_id, away_team_id,
                        quarter, home_score, away_score, status, created_at
                 from games where game_id = any($1) order by game_id",
            )
            .bind(ids.to_vec()),
            None => sqlx::query(
                "select game_id, home_team, away_team, home_team_id, away_team_id,
                        quarter, home_score, away_score, status, created_at
                 from games order by game_id",
            ),
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_game).collect())
    }

    async fn game_events_scoped(&self, game_ids: Option<&[i32]>) -> EtlResult<Vec<GameEvent>> {
        let query = match game_ids {
            Some(ids) => sqlx::query(
                "select event_id, game_id, quarter, team, event_type,
                        player_number, player_id, foul_type, created_at
                 from game_events where game_id = any($1) order by event_id",
            )
            .bind(ids.to_vec()),
            None => sqlx::query(
                "select event_id, game_id, quarter, team, event_type,
                        player_number, player_id, foul_type, created_at
                 from game_events order by event_id",
            ),
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EtlError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_event).collect())
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
