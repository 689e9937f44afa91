use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: i32,
    pub name: String,
    pub city: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: i32,
    pub team_id: i32,
    pub number: Option<i32>,
    pub name: String,
    pub position: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: i32,
    pub home_team: String,
    pub away_team: String,
    pub home_team_id: Option<i32>,
    pub away_team_id: Option<i32>,
    pub quarter: i32,
    pub home_score: i32,
    pub away_score: i32,
    /// SCHEDULED, IN_PROGRESS, FINISHED, CANCELLED or SUSPENDED, as
    /// written by the upstream league API. Copied as text.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub event_id: i32,
    pub game_id: i32,
    pub quarter: i32,
    /// HOME or AWAY.
    pub team: String,
    /// POINT_1, POINT_2, POINT_3, FOUL, DISQUALIFIED, ...
    pub event_type: String,
    pub player_number: Option<i32>,
    pub player_id: Option<i32>,
    pub foul_type: Option<String>,
    pub created_at: DateTime<Utc>,
}
