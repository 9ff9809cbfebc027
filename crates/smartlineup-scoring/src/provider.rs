// Player data provider boundary and an in-memory implementation.
//
// The resolver only ever reads through `PlayerDataProvider`; where the data
// came from (CSV, a sheet export, a test fixture) is not its concern.

use std::collections::BTreeMap;

use smartlineup_core::{Availability, Position};

/// Source name used for the plain `projection` column of a player row.
pub const BASE_PROJECTION_SOURCE: &str = "base";

/// Fantasy points scored in one past game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameLog {
    pub week: u32,
    pub fantasy_points: f64,
}

/// Raw, possibly incomplete inputs for one player in one week.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerData {
    pub player_key: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub opponent: Option<String>,
    pub week: u32,
    pub salary: Option<u32>,
    /// Projected fantasy points keyed by source name.
    pub projections: BTreeMap<String, f64>,
    pub ceiling: Option<f64>,
    pub floor: Option<f64>,
    pub ownership_pct: Option<f64>,
    pub availability: Availability,
    /// Past games, any order. Only games before `week` are used.
    pub game_logs: Vec<GameLog>,
    /// Opponent defensive rank against the position, 1 = stingiest.
    pub opponent_def_rank: Option<u32>,
}

impl PlayerData {
    /// A bare record with only identity filled in.
    pub fn new(
        player_key: impl Into<String>,
        name: impl Into<String>,
        position: Position,
        team: impl Into<String>,
        week: u32,
    ) -> Self {
        Self {
            player_key: player_key.into(),
            name: name.into(),
            position,
            team: team.into(),
            opponent: None,
            week,
            salary: None,
            projections: BTreeMap::new(),
            ceiling: None,
            floor: None,
            ownership_pct: None,
            availability: Availability::Active,
            game_logs: Vec::new(),
            opponent_def_rank: None,
        }
    }
}

/// Read access to player records and team betting lines.
pub trait PlayerDataProvider {
    fn player(&self, player_key: &str, week: u32) -> Option<&PlayerData>;

    /// Every player with a record in `week`, in a stable order.
    fn players(&self, week: u32) -> Vec<&PlayerData>;

    /// Vegas implied team total for `team` in `week`.
    fn implied_total(&self, team: &str, week: u32) -> Option<f64>;

    /// All posted implied totals for `week`.
    fn implied_totals(&self, week: u32) -> Vec<f64>;
}

/// Provider backed by ordered maps. Used by the CSV loader and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    players: BTreeMap<(u32, String), PlayerData>,
    implied: BTreeMap<(u32, String), f64>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a player record. Returns the replaced record.
    pub fn insert_player(&mut self, data: PlayerData) -> Option<PlayerData> {
        self.players
            .insert((data.week, data.player_key.clone()), data)
    }

    pub fn set_implied_total(&mut self, team: impl Into<String>, week: u32, total: f64) {
        self.implied.insert((week, team.into()), total);
    }

    /// Append a game log to an existing record. Returns false if the player
    /// has no record in `week`.
    pub fn push_game_log(&mut self, player_key: &str, week: u32, log: GameLog) -> bool {
        match self.players.get_mut(&(week, player_key.to_string())) {
            Some(data) => {
                data.game_logs.push(log);
                true
            }
            None => false,
        }
    }

    /// Append a game log to every weekly record of a player. Returns the
    /// number of records updated.
    pub fn attach_game_log(&mut self, player_key: &str, log: GameLog) -> usize {
        let mut updated = 0;
        for ((_, key), data) in self.players.iter_mut() {
            if key == player_key {
                data.game_logs.push(log);
                updated += 1;
            }
        }
        updated
    }

    /// Add a projection from a named source to an existing record.
    pub fn add_projection(
        &mut self,
        player_key: &str,
        week: u32,
        source: impl Into<String>,
        points: f64,
    ) -> bool {
        match self.players.get_mut(&(week, player_key.to_string())) {
            Some(data) => {
                data.projections.insert(source.into(), points);
                true
            }
            None => false,
        }
    }

    /// Weeks with at least one player record, ascending.
    pub fn weeks(&self) -> Vec<u32> {
        let mut weeks: Vec<u32> = self.players.keys().map(|(w, _)| *w).collect();
        weeks.dedup();
        weeks
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl PlayerDataProvider for InMemoryProvider {
    fn player(&self, player_key: &str, week: u32) -> Option<&PlayerData> {
        self.players.get(&(week, player_key.to_string()))
    }

    fn players(&self, week: u32) -> Vec<&PlayerData> {
        self.players
            .range((week, String::new())..)
            .take_while(|((w, _), _)| *w == week)
            .map(|(_, data)| data)
            .collect()
    }

    fn implied_total(&self, team: &str, week: u32) -> Option<f64> {
        self.implied.get(&(week, team.to_string())).copied()
    }

    fn implied_totals(&self, week: u32) -> Vec<f64> {
        self.implied
            .iter()
            .filter(|((w, _), _)| *w == week)
            .map(|(_, total)| *total)
            .collect()
    }
}
