// SQLite persistence for weight profiles and generated lineup sets.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::lineup::LineupSet;
use crate::profile::{ProfileConfig, ProfileSaveRequest, WeightProfile, WeightProfileStore, Weights};

/// SQLite-backed store for weight profiles and lineup sets.
pub struct Database {
    conn: Mutex<Connection>,
}

/// A lineup set as it was saved, with its bookkeeping columns.
#[derive(Debug, Clone)]
pub struct StoredLineupSet {
    pub id: i64,
    pub week: u32,
    pub profile: String,
    pub created_at: DateTime<Utc>,
    pub set: LineupSet,
}

/// Resolve the configured database path. An empty string means the
/// platform data directory (e.g. `~/.local/share/smartlineup`).
pub fn resolve_db_path(configured: &str) -> Result<PathBuf> {
    if !configured.trim().is_empty() {
        return Ok(PathBuf::from(configured));
    }
    let dirs = directories::ProjectDirs::from("", "", "smartlineup")
        .context("could not determine a data directory for this platform")?;
    std::fs::create_dir_all(dirs.data_dir())
        .with_context(|| format!("failed to create {}", dirs.data_dir().display()))?;
    Ok(dirs.data_dir().join("smartlineup.db"))
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS weight_profiles (
                name       TEXT PRIMARY KEY,
                weights    TEXT NOT NULL,
                config     TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lineup_sets (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                week       INTEGER NOT NULL,
                profile    TEXT NOT NULL,
                template   TEXT NOT NULL,
                created_at TEXT NOT NULL,
                payload    TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_lineup_sets_week ON lineup_sets(week);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Persist a generated lineup set as JSON. Returns the new row id.
    pub fn save_lineup_set(&self, week: u32, profile: &str, set: &LineupSet) -> Result<i64> {
        let conn = self.conn();
        let payload = serde_json::to_string(set).context("failed to serialize lineup set")?;
        conn.execute(
            "INSERT INTO lineup_sets (week, profile, template, created_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![week, profile, set.template, Utc::now().to_rfc3339(), payload],
        )
        .context("failed to save lineup set")?;
        Ok(conn.last_insert_rowid())
    }

    /// Load every lineup set saved for `week`, oldest first.
    pub fn load_lineup_sets(&self, week: u32) -> Result<Vec<StoredLineupSet>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, week, profile, created_at, payload
                 FROM lineup_sets WHERE week = ?1 ORDER BY id",
            )
            .context("failed to prepare load_lineup_sets query")?;

        let rows = stmt
            .query_map(params![week], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("failed to query lineup sets")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map lineup set rows")?;

        rows.into_iter()
            .map(|(id, week, profile, created_at, payload)| {
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .with_context(|| format!("bad timestamp on lineup set {id}"))?
                    .with_timezone(&Utc);
                let set: LineupSet = serde_json::from_str(&payload)
                    .with_context(|| format!("failed to deserialize lineup set {id}"))?;
                Ok(StoredLineupSet {
                    id,
                    week,
                    profile,
                    created_at,
                    set,
                })
            })
            .collect()
    }
}

impl WeightProfileStore for Database {
    /// Insert or overwrite the profile stored under `request.name`.
    fn save_profile(&self, request: &ProfileSaveRequest) -> Result<()> {
        let conn = self.conn();
        let weights =
            serde_json::to_string(&request.weights).context("failed to serialize weights")?;
        let config =
            serde_json::to_string(&request.config).context("failed to serialize profile config")?;
        conn.execute(
            "INSERT OR REPLACE INTO weight_profiles (name, weights, config, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![request.name, weights, config, Utc::now().to_rfc3339()],
        )
        .context("failed to save weight profile")?;
        Ok(())
    }

    fn load_profile(&self, name: &str) -> Result<Option<WeightProfile>> {
        let conn = self.conn();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT weights, config FROM weight_profiles WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query weight profile")?;

        match row {
            Some((weights_json, config_json)) => {
                let weights: Weights = serde_json::from_str(&weights_json)
                    .context("failed to deserialize stored weights")?;
                let config: ProfileConfig = serde_json::from_str(&config_json)
                    .context("failed to deserialize stored profile config")?;
                Ok(Some(WeightProfile {
                    name: name.to_string(),
                    weights,
                    config,
                }))
            }
            None => Ok(None),
        }
    }

    fn list_profiles(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM weight_profiles ORDER BY name")
            .context("failed to prepare list_profiles query")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("failed to query weight profiles")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map weight profile rows")?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::{Lineup, LineupSlot};
    use crate::position::{Position, SlotKind};

    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn sample_set() -> LineupSet {
        let lineup = Lineup::new(vec![LineupSlot {
            slot: SlotKind::Qb,
            player_key: "qb-kc".into(),
            name: "Kansas QB".into(),
            position: Position::Quarterback,
            team: "KC".into(),
            base_salary: 7000,
            base_score: 21.5,
            multiplier: 1.0,
        }]);
        LineupSet {
            template: "classic".into(),
            salary_cap: 50_000,
            requested: 1,
            lineups: vec![lineup],
            captains: vec![],
            shortfall: None,
            warnings: vec![],
        }
    }

    #[test]
    fn profile_save_and_load_round_trip() {
        let db = test_db();
        let mut profile = WeightProfile::new("gpp", Weights::projection_only());
        profile.config.regression_threshold = 25.0;
        db.save_profile(&profile.save_as("gpp")).unwrap();

        let loaded = db.load_profile("gpp").unwrap().expect("profile should exist");
        assert_eq!(loaded, profile);
    }

    #[test]
    fn load_profile_returns_none_for_missing_name() {
        let db = test_db();
        assert!(db.load_profile("nope").unwrap().is_none());
    }

    #[test]
    fn save_profile_overwrites_previous_weights() {
        let db = test_db();
        let base = WeightProfile::new("cash", Weights::default());
        db.save_profile(&base.save_as("cash")).unwrap();
        let updated = WeightProfile::new("cash", Weights::projection_only());
        db.save_profile(&updated.save_as("cash")).unwrap();

        let loaded = db.load_profile("cash").unwrap().unwrap();
        assert_eq!(loaded.weights, Weights::projection_only());
        assert_eq!(db.list_profiles().unwrap(), vec!["cash".to_string()]);
    }

    #[test]
    fn list_profiles_sorted_by_name() {
        let db = test_db();
        for name in ["zeta", "alpha", "mid"] {
            db.save_profile(&WeightProfile::default().save_as(name)).unwrap();
        }
        assert_eq!(db.list_profiles().unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn lineup_sets_scoped_to_week() {
        let db = test_db();
        let set = sample_set();
        let id = db.save_lineup_set(5, "default", &set).unwrap();
        db.save_lineup_set(6, "default", &set).unwrap();

        let week5 = db.load_lineup_sets(5).unwrap();
        assert_eq!(week5.len(), 1);
        assert_eq!(week5[0].id, id);
        assert_eq!(week5[0].profile, "default");
        assert_eq!(week5[0].set, set);
        assert!(db.load_lineup_sets(7).unwrap().is_empty());
    }

    #[test]
    fn resolve_db_path_keeps_configured_value() {
        let path = resolve_db_path("local.db").unwrap();
        assert_eq!(path, PathBuf::from("local.db"));
    }
}
