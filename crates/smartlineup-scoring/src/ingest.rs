// Player pool loading from CSV exports.
//
// Three files feed an InMemoryProvider: a player sheet (one row per player
// per week, most columns optional), a game-log sheet and an optional
// long-format sheet of extra projection sources.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use smartlineup_core::config::DataPaths;
use smartlineup_core::{Availability, Position};

use crate::provider::{GameLog, InMemoryProvider, PlayerData, BASE_PROJECTION_SOURCE};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

/// Player sheet row. Unknown columns are ignored; blank cells read as None.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    week: u32,
    #[serde(default)]
    key: Option<String>,
    name: String,
    position: String,
    team: String,
    #[serde(default)]
    opponent: Option<String>,
    #[serde(default)]
    salary: Option<u32>,
    #[serde(default)]
    projection: Option<f64>,
    #[serde(default)]
    ceiling: Option<f64>,
    #[serde(default)]
    floor: Option<f64>,
    #[serde(default, alias = "own")]
    ownership: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "itt")]
    implied_total: Option<f64>,
    #[serde(default)]
    def_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawGameLog {
    key: String,
    week: u32,
    #[serde(alias = "fantasy_points")]
    points: f64,
}

#[derive(Debug, Deserialize)]
struct RawProjection {
    key: String,
    week: u32,
    source: String,
    points: f64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Stable key for rows without an explicit one: lowercase name words joined
/// by '-', then the team.
pub fn derive_player_key(name: &str, team: &str) -> String {
    let slug: Vec<String> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    format!("{}-{}", slug.join("-"), team.trim().to_lowercase())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn open(path: &Path) -> Result<std::fs::File, DataError> {
    std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, testable without temp files)
// ---------------------------------------------------------------------------

fn load_players_from_reader<R: Read>(
    rdr: R,
    provider: &mut InMemoryProvider,
) -> Result<usize, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut loaded = 0;
    for result in reader.deserialize::<RawPlayer>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };
        let name = raw.name.trim().to_string();
        let Some(position) = Position::from_str_pos(&raw.position) else {
            warn!("skipping player '{}': unknown position '{}'", name, raw.position);
            continue;
        };
        let team = raw.team.trim().to_uppercase();
        let player_key =
            non_empty(raw.key).unwrap_or_else(|| derive_player_key(&name, &team));

        let mut data = PlayerData::new(player_key, name, position, team.clone(), raw.week);
        data.opponent = non_empty(raw.opponent).map(|o| o.to_uppercase());
        data.salary = raw.salary;
        if let Some(p) = raw.projection.filter(|p| p.is_finite()) {
            data.projections.insert(BASE_PROJECTION_SOURCE.to_string(), p);
        }
        data.ceiling = raw.ceiling;
        data.floor = raw.floor;
        data.ownership_pct = raw.ownership;
        data.availability = raw
            .status
            .as_deref()
            .map(Availability::from_str_status)
            .unwrap_or_default();
        data.opponent_def_rank = raw.def_rank;

        if let Some(total) = raw.implied_total.filter(|t| t.is_finite()) {
            provider.set_implied_total(team, raw.week, total);
        }
        if let Some(previous) = provider.insert_player(data) {
            warn!(
                "duplicate player row for '{}' week {}, using latest",
                previous.player_key, previous.week
            );
        }
        loaded += 1;
    }
    Ok(loaded)
}

fn load_game_logs_from_reader<R: Read>(
    rdr: R,
    provider: &mut InMemoryProvider,
) -> Result<usize, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut attached = 0;
    for result in reader.deserialize::<RawGameLog>() {
        match result {
            Ok(raw) => {
                if !raw.points.is_finite() {
                    warn!("skipping game log for '{}': non-finite points", raw.key);
                    continue;
                }
                let log = GameLog {
                    week: raw.week,
                    fantasy_points: raw.points,
                };
                if provider.attach_game_log(&raw.key, log) == 0 {
                    warn!("game log for unknown player '{}' ignored", raw.key);
                    continue;
                }
                attached += 1;
            }
            Err(e) => {
                warn!("skipping malformed game log row: {}", e);
            }
        }
    }
    Ok(attached)
}

fn load_projections_from_reader<R: Read>(
    rdr: R,
    provider: &mut InMemoryProvider,
) -> Result<usize, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut added = 0;
    for result in reader.deserialize::<RawProjection>() {
        match result {
            Ok(raw) => {
                if !raw.points.is_finite() {
                    warn!("skipping projection for '{}': non-finite points", raw.key);
                    continue;
                }
                if !provider.add_projection(&raw.key, raw.week, raw.source.trim(), raw.points) {
                    warn!(
                        "projection for unknown player '{}' week {} ignored",
                        raw.key, raw.week
                    );
                    continue;
                }
                added += 1;
            }
            Err(e) => {
                warn!("skipping malformed projection row: {}", e);
            }
        }
    }
    Ok(added)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load a player sheet into `provider`. Returns the number of rows loaded.
pub fn load_players(path: &Path, provider: &mut InMemoryProvider) -> Result<usize, DataError> {
    load_players_from_reader(open(path)?, provider).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Attach game logs to already-loaded players.
pub fn load_game_logs(path: &Path, provider: &mut InMemoryProvider) -> Result<usize, DataError> {
    load_game_logs_from_reader(open(path)?, provider).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Add extra projection sources to already-loaded players.
pub fn load_projections(path: &Path, provider: &mut InMemoryProvider) -> Result<usize, DataError> {
    load_projections_from_reader(open(path)?, provider).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the whole player pool from the configured paths.
pub fn load_player_pool(paths: &DataPaths) -> Result<InMemoryProvider, DataError> {
    let mut provider = InMemoryProvider::new();
    let players = load_players(Path::new(&paths.players), &mut provider)?;
    if players == 0 {
        return Err(DataError::Validation(
            "player CSV produced zero valid rows".into(),
        ));
    }
    let logs = load_game_logs(Path::new(&paths.game_logs), &mut provider)?;
    let extra = match &paths.projections {
        Some(path) => load_projections(Path::new(path), &mut provider)?,
        None => 0,
    };
    info!(
        "loaded {} player rows, {} game logs, {} extra projections",
        players, logs, extra
    );
    Ok(provider)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PlayerDataProvider;

    #[test]
    fn player_rows_with_blank_optional_cells() {
        let csv_data = "\
week,key,name,position,team,opponent,salary,projection,ceiling,floor,ownership,status,implied_total,def_rank
6,mahomes-kc,Patrick Mahomes,QB,KC,BUF,8000,24.5,35,14,18.5,,27.5,12
6,,Rookie Back,RB,nyj,,,,,,,Q,,";

        let mut provider = InMemoryProvider::new();
        let n = load_players_from_reader(csv_data.as_bytes(), &mut provider).unwrap();
        assert_eq!(n, 2);

        let qb = provider.player("mahomes-kc", 6).unwrap();
        assert_eq!(qb.position, Position::Quarterback);
        assert_eq!(qb.salary, Some(8000));
        assert_eq!(qb.projections[BASE_PROJECTION_SOURCE], 24.5);
        assert_eq!(qb.ownership_pct, Some(18.5));
        assert_eq!(qb.opponent_def_rank, Some(12));
        assert_eq!(provider.implied_total("KC", 6), Some(27.5));

        let rb = provider.player("rookie-back-nyj", 6).unwrap();
        assert_eq!(rb.team, "NYJ");
        assert_eq!(rb.salary, None);
        assert!(rb.projections.is_empty());
        assert_eq!(rb.availability, Availability::Questionable);
        assert_eq!(rb.opponent, None);
    }

    #[test]
    fn unknown_position_and_malformed_rows_skipped() {
        let csv_data = "\
week,name,position,team,salary
6,Kicker Guy,K,KC,4000
six,Bad Week,WR,KC,5000
6,Valid Receiver,WR,KC,5000";

        let mut provider = InMemoryProvider::new();
        let n = load_players_from_reader(csv_data.as_bytes(), &mut provider).unwrap();
        assert_eq!(n, 1);
        assert!(provider.player("valid-receiver-kc", 6).is_some());
    }

    #[test]
    fn game_logs_attach_to_all_weeks_of_a_player() {
        let players = "\
week,key,name,position,team
5,wr1,Receiver,WR,KC
6,wr1,Receiver,WR,KC";
        let logs = "\
key,week,points
wr1,3,12.5
wr1,4,20.0
ghost,4,9.0";
        let mut provider = InMemoryProvider::new();
        load_players_from_reader(players.as_bytes(), &mut provider).unwrap();
        let attached = load_game_logs_from_reader(logs.as_bytes(), &mut provider).unwrap();
        assert_eq!(attached, 2);
        assert_eq!(provider.player("wr1", 5).unwrap().game_logs.len(), 2);
        assert_eq!(provider.player("wr1", 6).unwrap().game_logs.len(), 2);
    }

    #[test]
    fn extra_projection_sources() {
        let players = "\
week,key,name,position,team,projection
6,wr1,Receiver,WR,KC,15.0";
        let projections = "\
key,week,source,points
wr1,6,alt,17.0
wr1,7,alt,30.0";
        let mut provider = InMemoryProvider::new();
        load_players_from_reader(players.as_bytes(), &mut provider).unwrap();
        let added = load_projections_from_reader(projections.as_bytes(), &mut provider).unwrap();
        assert_eq!(added, 1);
        let wr = provider.player("wr1", 6).unwrap();
        assert_eq!(wr.projections.len(), 2);
        assert_eq!(wr.projections["alt"], 17.0);
    }

    #[test]
    fn derive_key_from_name_and_team() {
        assert_eq!(derive_player_key("Ja'Marr Chase", "CIN"), "ja-marr-chase-cin");
        assert_eq!(derive_player_key("  D.J. Moore ", "chi"), "d-j-moore-chi");
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut provider = InMemoryProvider::new();
        let err = load_players(Path::new("/nonexistent/players.csv"), &mut provider).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
