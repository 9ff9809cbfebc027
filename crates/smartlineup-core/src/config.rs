// Configuration loading and parsing (contest.toml, scoring.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::profile::{ProfileConfig, WeightProfile, Weights};
use crate::roster::{RosterTemplate, DEFAULT_SALARY_CAP};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub default_template: String,
    pub templates: BTreeMap<String, RosterTemplate>,
    pub rules: ContestRules,
    pub optimizer: OptimizerConfig,
    pub exposure: ExposureConfig,
    pub profile: WeightProfile,
    pub resolver: ResolverConfig,
    pub db_path: String,
    pub data_paths: DataPaths,
    pub logging: LoggingConfig,
}

impl Config {
    /// Look up a roster template by name.
    pub fn template(&self, name: &str) -> Option<&RosterTemplate> {
        self.templates.get(name)
    }

    pub fn template_names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// contest.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire contest.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ContestFile {
    contest: ContestSection,
    templates: BTreeMap<String, TemplateSection>,
    #[serde(default)]
    rules: ContestRules,
    #[serde(default)]
    optimizer: OptimizerConfig,
    #[serde(default)]
    exposure: ExposureConfig,
    database: DatabaseSection,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct ContestSection {
    default_template: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TemplateSection {
    #[serde(default = "default_salary_cap")]
    salary_cap: u32,
    #[serde(default)]
    captain_mode: bool,
    slots: BTreeMap<String, usize>,
    #[serde(default)]
    max_players_per_team: Option<usize>,
}

fn default_salary_cap() -> u32 {
    DEFAULT_SALARY_CAP
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// Log file location and filter. `RUST_LOG` and `--log-level` take
/// precedence over `level`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Relative to the base directory unless absolute.
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

pub const DEFAULT_LOG_LEVEL: &str = "smartlineup=info,warn";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

/// Contest rules fed to the constraint builder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContestRules {
    /// Require pass-catchers from the selected QB's team (classic only).
    #[serde(default = "default_true")]
    pub stacking: bool,
    /// Number of WR/TE teammates required per selected QB.
    #[serde(default = "default_min_stack")]
    pub min_stack: usize,
    /// Ceiling on the summed ownership of a lineup, in percentage points.
    #[serde(default)]
    pub max_total_ownership: Option<f64>,
    /// Players owned above this percentage are left out of the pool.
    #[serde(default)]
    pub max_player_ownership: Option<f64>,
    /// Lineups must spend at least this much salary.
    #[serde(default)]
    pub min_salary: Option<u32>,
    /// Per-template override lives on the template; this is the fallback.
    #[serde(default)]
    pub max_players_per_team: Option<usize>,
    /// Template-specific team caps, filled from `[templates.<name>]`.
    #[serde(skip)]
    pub template_team_caps: BTreeMap<String, usize>,
}

fn default_true() -> bool {
    true
}

fn default_min_stack() -> usize {
    1
}

impl Default for ContestRules {
    fn default() -> Self {
        Self {
            stacking: true,
            min_stack: 1,
            max_total_ownership: None,
            max_player_ownership: None,
            min_salary: None,
            max_players_per_team: None,
            template_team_caps: BTreeMap::new(),
        }
    }
}

impl ContestRules {
    /// Team cap in effect for a template.
    pub fn team_cap_for(&self, template: &str) -> Option<usize> {
        self.template_team_caps
            .get(template)
            .copied()
            .or(self.max_players_per_team)
    }
}

/// Solver-driver settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_lineup_count")]
    pub lineup_count: usize,
    /// Every pair of lineups must differ by at least this many players.
    #[serde(default = "default_min_unique")]
    pub min_unique_players: usize,
    /// Overlap relaxations allowed across the whole set, not per lineup.
    #[serde(default = "default_max_relaxations")]
    pub max_relaxations: usize,
    /// Checked between solves; a running solve is not interrupted.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Scale of the seeded tie-break jitter (fantasy points). 0 disables it.
    #[serde(default)]
    pub randomness: f64,
    #[serde(default)]
    pub seed: u64,
    /// Points subtracted per 10% of ownership in the objective.
    #[serde(default)]
    pub ownership_leverage: f64,
    /// Distinct captains wanted per showdown set. Each captain is held to
    /// ceil(lineup_count / target) lineups while alternatives exist.
    #[serde(default = "default_captain_target_min")]
    pub captain_target_min: usize,
}

fn default_lineup_count() -> usize {
    10
}

fn default_min_unique() -> usize {
    2
}

fn default_max_relaxations() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_captain_target_min() -> usize {
    4
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lineup_count: default_lineup_count(),
            min_unique_players: default_min_unique(),
            max_relaxations: default_max_relaxations(),
            timeout_secs: default_timeout_secs(),
            randomness: 0.0,
            seed: 0,
            ownership_leverage: 0.0,
            captain_target_min: default_captain_target_min(),
        }
    }
}

/// Max-exposure tiers keyed by Smart Score percentile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExposureConfig {
    /// Max exposure (fraction of lineups) for players below every tier.
    #[serde(default = "default_max_exposure")]
    pub default_max: f64,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<ExposureTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ExposureTier {
    pub min_percentile: f64,
    pub max_exposure: f64,
}

fn default_max_exposure() -> f64 {
    0.4
}

fn default_tiers() -> Vec<ExposureTier> {
    vec![
        ExposureTier {
            min_percentile: 0.9,
            max_exposure: 0.7,
        },
        ExposureTier {
            min_percentile: 0.7,
            max_exposure: 0.55,
        },
    ]
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            default_max: default_max_exposure(),
            tiers: default_tiers(),
        }
    }
}

impl ExposureConfig {
    /// Max exposure fraction for a player at `percentile` (0.0..=1.0).
    /// The highest tier whose threshold the player meets wins.
    pub fn max_for_percentile(&self, percentile: f64) -> f64 {
        self.tiers
            .iter()
            .filter(|t| percentile >= t.min_percentile)
            .map(|t| t.max_exposure)
            .fold(self.default_max, f64::max)
    }
}

// ---------------------------------------------------------------------------
// scoring.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ScoringFile {
    profile: ProfileSection,
    #[serde(default)]
    resolver: ResolverConfig,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct ProfileSection {
    name: String,
    weights: Weights,
    #[serde(default)]
    config: ProfileConfig,
}

/// Thresholds used by the factor resolver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolverConfig {
    /// Games required before a usage trend is computed.
    #[serde(default = "default_min_games")]
    pub min_games: usize,
    /// Recent-game window for the trend.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// Trend adjustments are clamped to +/- this many points.
    #[serde(default = "default_trend_clamp")]
    pub trend_clamp: f64,
    /// League-average implied team total used when no lines are posted.
    #[serde(default = "default_league_avg_itt")]
    pub league_avg_implied_total: f64,
    /// Opponent defensive ranks 1..=tough_rank_max are the tough bucket.
    #[serde(default = "default_tough_rank_max")]
    pub tough_rank_max: u32,
    /// Ranks soft_rank_min.. are the soft bucket.
    #[serde(default = "default_soft_rank_min")]
    pub soft_rank_min: u32,
    #[serde(default = "default_tough_adjustment")]
    pub tough_adjustment: f64,
    #[serde(default = "default_soft_adjustment")]
    pub soft_adjustment: f64,
}

fn default_min_games() -> usize {
    3
}

fn default_trend_window() -> usize {
    3
}

fn default_trend_clamp() -> f64 {
    10.0
}

fn default_league_avg_itt() -> f64 {
    22.5
}

fn default_tough_rank_max() -> u32 {
    10
}

fn default_soft_rank_min() -> u32 {
    23
}

fn default_tough_adjustment() -> f64 {
    -0.10
}

fn default_soft_adjustment() -> f64 {
    0.10
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_games: default_min_games(),
            trend_window: default_trend_window(),
            trend_clamp: default_trend_clamp(),
            league_avg_implied_total: default_league_avg_itt(),
            tough_rank_max: default_tough_rank_max(),
            soft_rank_min: default_soft_rank_min(),
            tough_adjustment: default_tough_adjustment(),
            soft_adjustment: default_soft_adjustment(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
    pub game_logs: String,
    /// Optional long-format file of extra projection sources.
    #[serde(default)]
    pub projections: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/contest.toml` and
/// `config/scoring.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- contest.toml (required) ---
    let contest_path = config_dir.join("contest.toml");
    let contest_text = read_file(&contest_path)?;
    let contest_file: ContestFile =
        toml::from_str(&contest_text).map_err(|e| ConfigError::ParseError {
            path: contest_path.clone(),
            source: e,
        })?;

    // --- scoring.toml (required) ---
    let scoring_path = config_dir.join("scoring.toml");
    let scoring_text = read_file(&scoring_path)?;
    let scoring_file: ScoringFile =
        toml::from_str(&scoring_text).map_err(|e| ConfigError::ParseError {
            path: scoring_path.clone(),
            source: e,
        })?;

    let mut rules = contest_file.rules;
    let mut templates = BTreeMap::new();
    for (name, section) in &contest_file.templates {
        let template = RosterTemplate::from_slot_counts(
            name,
            section.salary_cap,
            section.captain_mode,
            &section.slots,
        )
        .map_err(|slot| ConfigError::ValidationError {
            field: format!("templates.{name}.slots"),
            message: format!("unknown slot `{slot}`"),
        })?;
        if let Some(cap) = section.max_players_per_team {
            rules.template_team_caps.insert(name.clone(), cap);
        }
        templates.insert(name.clone(), template);
    }

    let profile = WeightProfile {
        name: scoring_file.profile.name,
        weights: scoring_file.profile.weights,
        config: scoring_file.profile.config,
    };

    let config = Config {
        default_template: contest_file.contest.default_template,
        templates,
        rules,
        optimizer: contest_file.optimizer,
        exposure: contest_file.exposure,
        profile,
        resolver: scoring_file.resolver,
        db_path: contest_file.database.path,
        data_paths: scoring_file.data_paths,
        logging: contest_file.logging,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    copied.sort();
    Ok(copied)
}

/// Convenience wrapper: loads config relative to `base_dir`, copying
/// defaults first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if !config.templates.contains_key(&config.default_template) {
        return Err(invalid(
            "contest.default_template",
            format!("no template named `{}`", config.default_template),
        ));
    }

    for (name, template) in &config.templates {
        if template.salary_cap == 0 {
            return Err(invalid(
                format!("templates.{name}.salary_cap"),
                "must be greater than 0",
            ));
        }
        if template.roster_size() == 0 {
            return Err(invalid(
                format!("templates.{name}.slots"),
                "must define at least one slot",
            ));
        }
        let captains: usize = template
            .slots
            .iter()
            .filter(|s| s.kind == crate::position::SlotKind::Cpt)
            .map(|s| s.count)
            .sum();
        if template.captain_mode && captains != 1 {
            return Err(invalid(
                format!("templates.{name}.slots"),
                format!("captain mode requires exactly one CPT slot, got {captains}"),
            ));
        }
        if !template.captain_mode && captains > 0 {
            return Err(invalid(
                format!("templates.{name}.slots"),
                "CPT slots require captain_mode = true",
            ));
        }
    }

    let opt = &config.optimizer;
    if opt.lineup_count == 0 {
        return Err(invalid("optimizer.lineup_count", "must be > 0"));
    }
    if opt.min_unique_players == 0 {
        return Err(invalid("optimizer.min_unique_players", "must be > 0"));
    }
    if opt.timeout_secs == 0 {
        return Err(invalid("optimizer.timeout_secs", "must be > 0"));
    }
    if !opt.randomness.is_finite() || opt.randomness < 0.0 {
        return Err(invalid(
            "optimizer.randomness",
            format!("must be >= 0, got {}", opt.randomness),
        ));
    }
    if !opt.ownership_leverage.is_finite() || opt.ownership_leverage < 0.0 {
        return Err(invalid(
            "optimizer.ownership_leverage",
            format!("must be >= 0, got {}", opt.ownership_leverage),
        ));
    }

    if config.logging.level.trim().is_empty() {
        return Err(invalid("logging.level", "must not be empty"));
    }
    if config.logging.dir.trim().is_empty() {
        return Err(invalid("logging.dir", "must not be empty"));
    }

    let exp = &config.exposure;
    if !(exp.default_max > 0.0 && exp.default_max <= 1.0) {
        return Err(invalid(
            "exposure.default_max",
            format!("must be in (0, 1], got {}", exp.default_max),
        ));
    }
    for (i, tier) in exp.tiers.iter().enumerate() {
        if !(0.0..=1.0).contains(&tier.min_percentile) {
            return Err(invalid(
                format!("exposure.tiers[{i}].min_percentile"),
                format!("must be between 0.0 and 1.0 inclusive, got {}", tier.min_percentile),
            ));
        }
        if !(tier.max_exposure > 0.0 && tier.max_exposure <= 1.0) {
            return Err(invalid(
                format!("exposure.tiers[{i}].max_exposure"),
                format!("must be in (0, 1], got {}", tier.max_exposure),
            ));
        }
    }

    // Weights may be zero (the engine falls back to equal weights) but never negative.
    let w = &config.profile.weights;
    let weight_fields: &[(&str, f64)] = &[
        ("weights.W1", w.W1),
        ("weights.W2", w.W2),
        ("weights.W3", w.W3),
        ("weights.W4", w.W4),
        ("weights.W5", w.W5),
        ("weights.W6", w.W6),
        ("weights.W7", w.W7),
        ("weights.W8", w.W8),
    ];
    for (name, val) in weight_fields {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(*name, format!("must be >= 0, got {val}")));
        }
    }

    let r = &config.resolver;
    if r.min_games == 0 || r.trend_window == 0 {
        return Err(invalid("resolver.min_games", "min_games and trend_window must be > 0"));
    }
    if r.league_avg_implied_total <= 0.0 {
        return Err(invalid(
            "resolver.league_avg_implied_total",
            format!("must be > 0, got {}", r.league_avg_implied_total),
        ));
    }
    if r.tough_rank_max >= r.soft_rank_min {
        return Err(invalid(
            "resolver.tough_rank_max",
            format!(
                "must be below soft_rank_min ({} >= {})",
                r.tough_rank_max, r.soft_rank_min
            ),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
