// Command pipelines: load, score, compare, optimize. Shared by the binary
// and the integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use smartlineup_core::config::{Config, DataPaths, ResolverConfig};
use smartlineup_core::{
    Factor, LineupSet, PlayerScore, ProfileSaveRequest, WeightProfile, WeightProfileStore, Weights,
};
use smartlineup_optimizer::{build, optimize, BuildOptions, GoodLpSolver, OptimizerOptions};
use smartlineup_scoring::engine::diff_scores;
use smartlineup_scoring::ingest::load_player_pool;
use smartlineup_scoring::{score_week, InMemoryProvider, ScoreDelta};
use tracing::info;

/// Built-in profile that ranks by projection alone.
pub const PROJECTION_ONLY: &str = "projection_only";

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the player pool, resolving relative data paths against `base_dir`.
pub fn load_pool(base_dir: &Path, paths: &DataPaths) -> Result<InMemoryProvider> {
    let resolve = |p: &str| base_dir.join(p).display().to_string();
    let resolved = DataPaths {
        players: resolve(&paths.players),
        game_logs: resolve(&paths.game_logs),
        projections: paths.projections.as_deref().map(resolve),
    };
    load_player_pool(&resolved).context("failed to load player pool")
}

/// Look up a profile by name: the configured default, the built-in
/// projection-only profile, or one saved in the store.
pub fn resolve_profile(
    config: &Config,
    store: &dyn WeightProfileStore,
    name: Option<&str>,
) -> Result<WeightProfile> {
    match name {
        None => Ok(config.profile.clone()),
        Some(n) if n == config.profile.name => Ok(config.profile.clone()),
        Some(PROJECTION_ONLY) => Ok(WeightProfile {
            name: PROJECTION_ONLY.into(),
            weights: Weights::projection_only(),
            config: config.profile.config.clone(),
        }),
        Some(n) => store
            .load_profile(n)?
            .ok_or_else(|| anyhow!("no saved profile named `{n}`")),
    }
}

/// Parse `W1=0.4` style overrides. Codes are case-insensitive.
pub fn parse_weight_override(s: &str) -> Result<(Factor, f64)> {
    let (code, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected CODE=VALUE, got `{s}`"))?;
    let factor = Factor::ALL
        .into_iter()
        .find(|f| f.code().eq_ignore_ascii_case(code.trim()))
        .ok_or_else(|| anyhow!("unknown weight `{}` (expected W1..W8)", code.trim()))?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid weight value in `{s}`"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("weight {} must be finite and non-negative, got {value}", factor.code());
    }
    Ok((factor, value))
}

/// Parse `kc-wr1=0.4` style exposure overrides: a player key and a fraction
/// of the set between 0 and 1.
pub fn parse_exposure_override(s: &str) -> Result<(String, f64)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected PLAYER=FRACTION, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("missing player key in `{s}`");
    }
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid exposure fraction in `{s}`"))?;
    if !(0.0..=1.0).contains(&value) {
        bail!("exposure for {key} must be between 0 and 1, got {value}");
    }
    Ok((key.to_string(), value))
}

/// Persist `base` under `name` with the given weight overrides applied.
pub fn save_profile(
    store: &dyn WeightProfileStore,
    base: &WeightProfile,
    name: &str,
    overrides: &[(Factor, f64)],
) -> Result<ProfileSaveRequest> {
    if name.trim().is_empty() {
        bail!("profile name must not be empty");
    }
    let mut request = base.save_as(name.trim());
    for (factor, value) in overrides {
        request.weights = request.weights.with(*factor, *value);
    }
    store.save_profile(&request)?;
    info!("saved profile '{}'", request.name);
    Ok(request)
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub week: u32,
    pub profile: String,
    pub generated_at: DateTime<Utc>,
    /// Players scored with at least one defaulted factor.
    pub defaulted: usize,
    pub scores: Vec<PlayerScore>,
}

pub fn score_report(
    provider: &InMemoryProvider,
    week: u32,
    profile: &WeightProfile,
    resolver: &ResolverConfig,
    top: Option<usize>,
) -> Result<ScoreReport> {
    let scored = score_week(provider, week, profile, resolver)?;
    if scored.scores.is_empty() {
        bail!("no players found for week {week}");
    }
    let defaulted = scored.scores.iter().filter(|s| s.computed_with_defaults()).count();
    let mut scores = scored.scores;
    if let Some(n) = top {
        scores.truncate(n);
    }
    Ok(ScoreReport {
        week,
        profile: profile.name.clone(),
        generated_at: Utc::now(),
        defaulted,
        scores,
    })
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProfileComparison {
    pub profile: String,
    pub top: Vec<PlayerScore>,
    /// Movement against the baseline profile, largest first. Empty for the
    /// baseline itself.
    pub deltas: Vec<ScoreDelta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub week: u32,
    pub baseline: String,
    pub generated_at: DateTime<Utc>,
    pub profiles: Vec<ProfileComparison>,
}

/// Score the same week under several profiles on the blocking pool and diff
/// each against the first.
pub async fn compare_profiles(
    provider: Arc<InMemoryProvider>,
    week: u32,
    profiles: Vec<WeightProfile>,
    resolver: ResolverConfig,
    top: usize,
) -> Result<CompareReport> {
    let Some(baseline) = profiles.first().map(|p| p.name.clone()) else {
        bail!("at least one profile is required");
    };

    let handles: Vec<_> = profiles
        .into_iter()
        .map(|profile| {
            let provider = Arc::clone(&provider);
            let resolver = resolver.clone();
            tokio::task::spawn_blocking(move || {
                score_week(provider.as_ref(), week, &profile, &resolver)
                    .map(|scored| (profile.name, scored.scores))
            })
        })
        .collect();

    let mut runs = Vec::with_capacity(handles.len());
    for handle in handles {
        let run = handle.await.context("scoring task panicked")??;
        runs.push(run);
    }

    let base_scores = runs[0].1.clone();
    let profiles = runs
        .into_iter()
        .enumerate()
        .map(|(i, (profile, scores))| {
            let deltas = if i == 0 {
                Vec::new()
            } else {
                diff_scores(&base_scores, &scores)
            };
            ProfileComparison {
                profile,
                top: scores.into_iter().take(top).collect(),
                deltas,
            }
        })
        .collect();

    info!("compared profiles for week {} against '{}'", week, baseline);
    Ok(CompareReport {
        week,
        baseline,
        generated_at: Utc::now(),
        profiles,
    })
}

// ---------------------------------------------------------------------------
// Optimize
// ---------------------------------------------------------------------------

/// Per-run overrides on top of the configured contest rules.
#[derive(Debug, Clone, Default)]
pub struct OptimizeRequest {
    pub template: Option<String>,
    pub lineup_count: Option<usize>,
    pub locked: BTreeSet<String>,
    pub excluded: BTreeSet<String>,
    pub locked_captain: Option<String>,
    pub seed: Option<u64>,
    pub max_exposure: BTreeMap<String, f64>,
    pub min_exposure: BTreeMap<String, f64>,
    /// Restrict the pool to these teams, e.g. the two sides of a showdown
    /// game. Empty keeps every team.
    pub teams: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeReport {
    pub week: u32,
    pub profile: String,
    pub generated_at: DateTime<Utc>,
    pub lineups: LineupSet,
}

/// Score the week, build the template's constraints and generate lineups.
pub fn optimize_week(
    config: &Config,
    provider: &InMemoryProvider,
    week: u32,
    profile: &WeightProfile,
    request: &OptimizeRequest,
) -> Result<OptimizeReport> {
    let template = request
        .template
        .as_deref()
        .unwrap_or(config.default_template.as_str());
    let mut scored = score_week(provider, week, profile, &config.resolver)?;
    if !request.teams.is_empty() {
        let teams: BTreeSet<String> = request.teams.iter().map(|t| t.to_uppercase()).collect();
        scored.factors.retain(|f| teams.contains(&f.team.to_uppercase()));
        let kept: BTreeSet<&str> = scored.factors.iter().map(|f| f.player_key.as_str()).collect();
        scored.scores.retain(|s| kept.contains(s.player_key.as_str()));
        info!(
            "slate limited to {:?}: {} players",
            teams,
            scored.factors.len()
        );
    }
    if scored.factors.is_empty() {
        bail!("no players found for week {week}");
    }

    let build_options = BuildOptions {
        locked: request.locked.clone(),
        excluded: request.excluded.clone(),
        locked_captain: request.locked_captain.clone(),
        ..BuildOptions::from_rules(&config.rules, template)
    };
    let set = build(template, &config.templates, &scored.factors, &build_options)
        .with_context(|| format!("failed to build constraints for template `{template}`"))?;

    let mut options = OptimizerOptions::from_config(&config.optimizer, &config.exposure);
    if let Some(seed) = request.seed {
        options.seed = seed;
    }
    options.max_exposure = request.max_exposure.clone();
    options.min_exposure = request.min_exposure.clone();
    let count = request.lineup_count.unwrap_or(config.optimizer.lineup_count);

    let lineups = optimize(&set, &scored.scores, count, &options, &GoodLpSolver::new())?;
    Ok(OptimizeReport {
        week,
        profile: profile.name.clone(),
        generated_at: Utc::now(),
        lineups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_override_parsing() {
        assert_eq!(parse_weight_override("W1=0.5").unwrap(), (Factor::Projection, 0.5));
        assert_eq!(parse_weight_override("w8 = 1").unwrap(), (Factor::Matchup, 1.0));
        assert!(parse_weight_override("W9=1").is_err());
        assert!(parse_weight_override("W1").is_err());
        assert!(parse_weight_override("W2=-0.1").is_err());
        assert!(parse_weight_override("W2=abc").is_err());
    }

    #[test]
    fn exposure_override_parsing() {
        assert_eq!(
            parse_exposure_override("kc-wr1=0.4").unwrap(),
            ("kc-wr1".to_string(), 0.4)
        );
        assert_eq!(
            parse_exposure_override(" buf-qb = 1 ").unwrap(),
            ("buf-qb".to_string(), 1.0)
        );
        assert!(parse_exposure_override("kc-wr1").is_err());
        assert!(parse_exposure_override("=0.5").is_err());
        assert!(parse_exposure_override("kc-wr1=1.5").is_err());
        assert!(parse_exposure_override("kc-wr1=-0.1").is_err());
        assert!(parse_exposure_override("kc-wr1=NaN").is_err());
    }
}
