pub mod destination;
pub mod models;
pub mod source;

use serde::Serialize;

/// The four synced entities, in fixed sync order: players reference
/// teams and events reference games, so referenced tables go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Teams,
    Players,
    Games,
    GameEvents,
}

impl SyncTable {
    pub const ALL: [SyncTable; 4] = [
        SyncTable::Teams,
        SyncTable::Players,
        SyncTable::Games,
        SyncTable::GameEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTable::Teams => "teams",
            SyncTable::Players => "players",
            SyncTable::Games => "games",
            SyncTable::GameEvents => "game_events",
        }
    }

    pub fn checkpoint_key(&self) -> &'static str {
        match self {
            SyncTable::Teams => "teams_last_id",
            SyncTable::Players => "players_last_id",
            SyncTable::Games => "games_last_id",
            SyncTable::GameEvents => "game_events_last_id",
        }
    }

    pub fn parse(name: &str) -> Option<SyncTable> {
        match name {
            "teams" => Some(SyncTable::Teams),
            "players" => Some(SyncTable::Players),
            "games" => Some(SyncTable::Games),
            "game_events" => Some(SyncTable::GameEvents),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_all_table_names() {
        for table in SyncTable::ALL {
            assert_eq!(SyncTable::parse(table.as_str()), Some(table));
        }
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(SyncTable::parse("referees"), None);
        assert_eq!(SyncTable::parse(""), None);
        assert_eq!(SyncTable::parse("Teams"), None);
    }

    #[test]
    fn sync_order_puts_referenced_tables_first() {
        assert_eq!(SyncTable::ALL[0], SyncTable::Teams);
        assert_eq!(SyncTable::ALL[3], SyncTable::GameEvents);
    }
}
