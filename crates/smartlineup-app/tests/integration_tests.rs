// Integration tests for smartlineup.
//
// These exercise the full pipeline through the application crate's public
// API: config loading, CSV ingestion, scoring under several profiles, lineup
// generation for classic and showdown templates, and SQLite persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use smartlineup_app::pipeline::{self, OptimizeRequest, PROJECTION_ONLY};
use smartlineup_core::config::{load_config, Config, DataPaths, ExposureConfig};
use smartlineup_core::db::Database;
use smartlineup_core::{Factor, SlotKind, Warning, WeightProfileStore};
use smartlineup_optimizer::{BuildError, OptimizeError};
use smartlineup_scoring::{InMemoryProvider, PlayerDataProvider};

// ===========================================================================
// Test helpers
// ===========================================================================

const WEEK: u32 = 6;

fn crate_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Load the shipped defaults through a scratch project directory.
fn test_config(tag: &str) -> Config {
    let tmp = std::env::temp_dir().join(format!("smartlineup_it_{tag}"));
    let _ = fs::remove_dir_all(&tmp);
    let defaults = tmp.join("defaults");
    fs::create_dir_all(&defaults).unwrap();
    let shipped = crate_dir().join("../../defaults");
    for file in ["contest.toml", "scoring.toml"] {
        fs::copy(shipped.join(file), defaults.join(file)).unwrap();
    }

    let mut config = load_config(&tmp).expect("defaults should load");
    config.data_paths = DataPaths {
        players: "tests/fixtures/players.csv".into(),
        game_logs: "tests/fixtures/game_logs.csv".into(),
        projections: None,
    };
    config
}

fn pool(config: &Config) -> InMemoryProvider {
    pipeline::load_pool(&crate_dir(), &config.data_paths).expect("fixture pool should load")
}

/// No percentile ceilings; diversity comes from overlap cuts alone.
fn open_exposure(config: &mut Config) {
    config.exposure = ExposureConfig {
        default_max: 1.0,
        tiers: vec![],
    };
}

fn request(count: usize) -> OptimizeRequest {
    OptimizeRequest {
        lineup_count: Some(count),
        ..OptimizeRequest::default()
    }
}

/// Showdown request limited to the KC at BUF game.
fn showdown_request(count: usize) -> OptimizeRequest {
    OptimizeRequest {
        template: Some("showdown".into()),
        teams: BTreeSet::from(["KC".to_string(), "BUF".to_string()]),
        ..request(count)
    }
}

// ===========================================================================
// Ingestion and scoring
// ===========================================================================

#[test]
fn fixture_pool_skips_malformed_rows() {
    let config = test_config("pool");
    let provider = pool(&config);

    let players = provider.players(WEEK);
    assert_eq!(players.len(), 33);
    assert!(provider.player("bad-row", WEEK).is_none());
    assert_eq!(provider.player("kc-qb", WEEK).unwrap().game_logs.len(), 5);
    assert!(provider.player("phi-wr3", WEEK).unwrap().game_logs.is_empty());
    assert_eq!(provider.implied_total("KC", WEEK), Some(27.5));
}

#[test]
fn projection_only_profile_ranks_highest_projection_first() {
    let config = test_config("projection_only");
    let provider = pool(&config);
    let db = Database::open(":memory:").unwrap();

    let profile = pipeline::resolve_profile(&config, &db, Some(PROJECTION_ONLY)).unwrap();
    let report =
        pipeline::score_report(&provider, WEEK, &profile, &config.resolver, None).unwrap();

    assert_eq!(report.scores[0].player_key, "kc-qb");
    assert!((report.scores[0].smart_score - 24.0).abs() < 1e-9);
    for pair in report.scores.windows(2) {
        assert!(pair[0].smart_score >= pair[1].smart_score);
    }
}

#[test]
fn default_profile_scores_everyone_with_finite_values() {
    let config = test_config("default_scores");
    let provider = pool(&config);
    let db = Database::open(":memory:").unwrap();

    let profile = pipeline::resolve_profile(&config, &db, None).unwrap();
    let report =
        pipeline::score_report(&provider, WEEK, &profile, &config.resolver, None).unwrap();

    assert_eq!(report.profile, config.profile.name);
    assert_eq!(report.scores.len(), 33);
    assert!(report.scores.iter().all(|s| s.smart_score.is_finite()));
    assert!(report.defaulted >= 1);

    // a player with no game history still scores, with trend flagged
    let rookie = report
        .scores
        .iter()
        .find(|s| s.player_key == "phi-wr3")
        .unwrap();
    assert!(rookie.missing_flags.contains(&Factor::Trend));
    assert!(rookie.missing_flags.contains(&Factor::Regression));

    let top = pipeline::score_report(&provider, WEEK, &profile, &config.resolver, Some(5))
        .unwrap();
    assert_eq!(top.scores.len(), 5);
    assert_eq!(top.scores[0], report.scores[0]);
}

#[test]
fn empty_week_is_an_error() {
    let config = test_config("empty_week");
    let provider = pool(&config);
    let err = pipeline::score_report(&provider, 17, &config.profile, &config.resolver, None)
        .unwrap_err();
    assert!(err.to_string().contains("week 17"));
}

#[tokio::test]
async fn compare_diffs_profiles_against_baseline() {
    let config = test_config("compare");
    let provider = Arc::new(pool(&config));
    let db = Database::open(":memory:").unwrap();

    let profiles = vec![
        pipeline::resolve_profile(&config, &db, None).unwrap(),
        pipeline::resolve_profile(&config, &db, Some(PROJECTION_ONLY)).unwrap(),
    ];
    let report =
        pipeline::compare_profiles(provider, WEEK, profiles, config.resolver.clone(), 3)
            .await
            .unwrap();

    assert_eq!(report.baseline, config.profile.name);
    assert_eq!(report.profiles.len(), 2);
    assert!(report.profiles[0].deltas.is_empty());
    assert_eq!(report.profiles[0].top.len(), 3);

    let deltas = &report.profiles[1].deltas;
    assert_eq!(report.profiles[1].profile, PROJECTION_ONLY);
    assert_eq!(deltas.len(), 33);
    for pair in deltas.windows(2) {
        assert!(pair[0].delta.abs() >= pair[1].delta.abs());
    }
}

#[tokio::test]
async fn compare_requires_a_profile() {
    let config = test_config("compare_empty");
    let provider = Arc::new(pool(&config));
    let result =
        pipeline::compare_profiles(provider, WEEK, vec![], config.resolver.clone(), 3).await;
    assert!(result.is_err());
}

// ===========================================================================
// Lineup generation
// ===========================================================================

#[test]
fn classic_lineups_are_legal() {
    let mut config = test_config("classic");
    open_exposure(&mut config);
    let provider = pool(&config);

    let report =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &request(3)).unwrap();
    let set = &report.lineups;

    assert_eq!(set.template, "classic");
    assert_eq!(set.len(), 3);
    assert!(set.shortfall.is_none());
    for lineup in &set.lineups {
        assert_eq!(lineup.slots.len(), 9);
        assert!(lineup.total_salary <= 50_000.0);
        assert!(!lineup.has_duplicate_player());
        assert!(!lineup.contains("dal-wr1"), "ruled-out player rostered");
        assert!(!lineup.contains("buf-fb"), "unpriced player rostered");
    }
    for (i, a) in set.lineups.iter().enumerate() {
        for b in &set.lineups[i + 1..] {
            assert!(a.shared_with(b) <= 7);
        }
    }

    let dropped: BTreeSet<&str> = set
        .warnings
        .iter()
        .filter_map(|w| match w {
            Warning::PlayerDropped { player_key, .. } => Some(player_key.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(dropped, BTreeSet::from(["buf-fb", "dal-wr1"]));
}

#[test]
fn default_exposure_tiers_cap_appearances() {
    let config = test_config("tiers");
    let provider = pool(&config);

    let report =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &request(5)).unwrap();
    let set = &report.lineups;

    assert!(!set.is_empty());
    // the highest tier allows 70% of five lineups
    for (key, count) in set.exposure_counts() {
        assert!(count <= 3, "{key} in {count} lineups");
    }
}

#[test]
fn locks_and_exclusions_are_honored() {
    let mut config = test_config("locks");
    open_exposure(&mut config);
    let provider = pool(&config);

    let req = OptimizeRequest {
        locked: BTreeSet::from(["dal-wr3".to_string()]),
        excluded: BTreeSet::from(["kc-qb".to_string()]),
        ..request(3)
    };
    let report =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).unwrap();

    for lineup in &report.lineups.lineups {
        assert!(lineup.contains("dal-wr3"));
        assert!(!lineup.contains("kc-qb"));
    }
}

#[test]
fn same_seed_same_lineups() {
    let mut config = test_config("determinism");
    open_exposure(&mut config);
    config.optimizer.randomness = 1.5;
    let provider = pool(&config);

    let req = OptimizeRequest {
        seed: Some(42),
        ..request(3)
    };
    let a = pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).unwrap();
    let b = pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).unwrap();
    assert_eq!(a.lineups, b.lineups);
}

#[test]
fn cap_below_cheapest_roster_reports_infeasible_template() {
    let mut config = test_config("infeasible");
    config.templates.get_mut("classic").unwrap().salary_cap = 30_000;
    let provider = pool(&config);

    let err = pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &request(3))
        .unwrap_err();
    match err.downcast_ref::<OptimizeError>() {
        Some(OptimizeError::InfeasibleTemplate { template }) => assert_eq!(template, "classic"),
        other => panic!("expected InfeasibleTemplate, got {other:?}"),
    }
}

#[test]
fn unknown_template_is_rejected() {
    let config = test_config("unknown_template");
    let provider = pool(&config);
    let req = OptimizeRequest {
        template: Some("tiebreaker".into()),
        ..request(1)
    };
    let err =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::UnknownTemplate(name)) if name == "tiebreaker"
    ));
}

#[test]
fn showdown_lineups_have_one_captain_each() {
    let mut config = test_config("showdown");
    open_exposure(&mut config);
    let provider = pool(&config);

    let report = pipeline::optimize_week(
        &config,
        &provider,
        WEEK,
        &config.profile,
        &showdown_request(3),
    )
    .unwrap();
    let set = &report.lineups;

    assert_eq!(set.len(), 3);
    assert_eq!(set.captains.len(), 3);
    for (i, lineup) in set.lineups.iter().enumerate() {
        assert_eq!(lineup.slots.len(), 6);
        assert!(lineup.slots.iter().all(|s| s.team == "KC" || s.team == "BUF"));
        let captains: Vec<_> = lineup.slots.iter().filter(|s| s.slot == SlotKind::Cpt).collect();
        assert_eq!(captains.len(), 1);
        assert_eq!(captains[0].player_key, set.captains[i].player_key);
        assert!(lineup.total_salary <= 50_000.0);

        let mut per_team: BTreeMap<&str, usize> = BTreeMap::new();
        for slot in &lineup.slots {
            *per_team.entry(slot.team.as_str()).or_default() += 1;
        }
        assert!(per_team.values().all(|n| *n <= 5));
    }
}

#[test]
fn showdown_set_spreads_captains() {
    let mut config = test_config("showdown_captains");
    open_exposure(&mut config);
    let provider = pool(&config);

    let report = pipeline::optimize_week(
        &config,
        &provider,
        WEEK,
        &config.profile,
        &showdown_request(10),
    )
    .unwrap();
    let set = &report.lineups;

    assert_eq!(set.len(), 10);
    let mut per_captain: BTreeMap<&str, usize> = BTreeMap::new();
    for captain in &set.captains {
        *per_captain.entry(captain.player_key.as_str()).or_default() += 1;
    }
    assert!(set.distinct_captains() >= 4, "captains: {per_captain:?}");
    assert!(!set
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::CaptainDiversity { .. })));
    for lineup in &set.lineups {
        assert!(lineup.total_salary <= 50_000.0);
    }
}

#[test]
fn slate_teams_filter_the_pool() {
    let mut config = test_config("slate_teams");
    open_exposure(&mut config);
    let provider = pool(&config);

    let req = OptimizeRequest {
        teams: BTreeSet::from(["phi".to_string(), "dal".to_string()]),
        template: Some("showdown".into()),
        ..request(2)
    };
    let report =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).unwrap();
    for lineup in &report.lineups.lineups {
        assert!(lineup.slots.iter().all(|s| s.team == "PHI" || s.team == "DAL"));
    }

    let req = OptimizeRequest {
        teams: BTreeSet::from(["NYG".to_string()]),
        ..request(1)
    };
    assert!(pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).is_err());
}

#[test]
fn per_player_exposure_overrides_apply() {
    let mut config = test_config("exposure_overrides");
    open_exposure(&mut config);
    let provider = pool(&config);

    let (key, fraction) = pipeline::parse_exposure_override("kc-qb=0.25").unwrap();
    let req = OptimizeRequest {
        max_exposure: BTreeMap::from([(key, fraction)]),
        ..request(4)
    };
    let report =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).unwrap();
    let counts = report.lineups.exposure_counts();
    assert!(counts.get("kc-qb").copied().unwrap_or(0) <= 1, "{counts:?}");
}

#[test]
fn locked_captain_over_cap_fails_before_solving() {
    let mut config = test_config("captain_over_cap");
    config.templates.get_mut("showdown").unwrap().salary_cap = 11_000;
    let provider = pool(&config);

    // 7,800 at 1.5x is 11,700
    let req = OptimizeRequest {
        template: Some("showdown".into()),
        locked_captain: Some("kc-qb".into()),
        ..request(1)
    };
    let err =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &req).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::LockedCaptainOverCap { player_key, .. }) if player_key == "kc-qb"
    ));
}

// ===========================================================================
// Persistence
// ===========================================================================

#[test]
fn saved_profile_round_trips_through_store() {
    let config = test_config("profile_store");
    let db = Database::open(":memory:").unwrap();

    let saved = pipeline::save_profile(
        &db,
        &config.profile,
        "heavy-proj",
        &[(Factor::Projection, 0.9), (Factor::Ownership, 0.0)],
    )
    .unwrap();
    assert_eq!(saved.weights.W1, 0.9);
    assert_eq!(saved.weights.W3, 0.0);
    assert_eq!(saved.weights.W2, config.profile.weights.W2);

    let loaded = pipeline::resolve_profile(&config, &db, Some("heavy-proj")).unwrap();
    assert_eq!(loaded.weights, saved.weights);
    assert_eq!(loaded.config, config.profile.config);
    assert_eq!(db.list_profiles().unwrap(), vec!["heavy-proj".to_string()]);

    assert!(pipeline::resolve_profile(&config, &db, Some("missing")).is_err());
    assert!(pipeline::save_profile(&db, &config.profile, "  ", &[]).is_err());
}

#[test]
fn generated_set_persists_by_week() {
    let mut config = test_config("persist_set");
    open_exposure(&mut config);
    let provider = pool(&config);
    let db = Database::open(":memory:").unwrap();

    let report =
        pipeline::optimize_week(&config, &provider, WEEK, &config.profile, &request(2)).unwrap();
    db.save_lineup_set(WEEK, &report.profile, &report.lineups).unwrap();

    let stored = db.load_lineup_sets(WEEK).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].profile, config.profile.name);
    assert_eq!(stored[0].set.len(), report.lineups.len());
    for (saved, original) in stored[0].set.lineups.iter().zip(&report.lineups.lineups) {
        assert_eq!(saved.player_keys(), original.player_keys());
        assert!((saved.total_score - original.total_score).abs() < 1e-9);
    }
    assert!(db.load_lineup_sets(WEEK + 1).unwrap().is_empty());
}

#[test]
fn fixture_paths_resolve_against_base_dir() {
    let config = test_config("paths");
    let err = pipeline::load_pool(Path::new("/nonexistent"), &config.data_paths).unwrap_err();
    assert!(format!("{err:#}").contains("players.csv"));
}
