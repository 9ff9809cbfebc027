// Smart Score engine: normalized weights x resolved factors.
//
// Every factor value is expressed in fantasy points so the normalized
// weights blend comparable magnitudes. The engine is stateless: re-scoring
// under a different profile is just another call.

use std::collections::BTreeMap;

use smartlineup_core::{Factor, PlayerFactor, PlayerScore, ProfileConfig, WeightProfile, Weights};
use tracing::debug;

/// Share of projection removed when the regression penalty applies.
pub const REGRESSION_SHARE: f64 = 0.2;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoreError {
    #[error("invalid weight {factor}: {value} (weights must be finite and non-negative)")]
    InvalidWeight { factor: Factor, value: f64 },

    #[error("profile '{profile}' changes how factors are resolved ({setting}); resolve the week again instead of re-scoring")]
    NeedsResolution { profile: String, setting: &'static str },
}

/// Change in one player's Smart Score between two profiles.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScoreDelta {
    pub player_key: String,
    pub old_score: f64,
    pub new_score: f64,
    pub delta: f64,
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Validate and normalize a weight vector so it sums to 1. An all-zero
/// vector becomes the uniform 1/8 vector.
pub fn normalize_weights(weights: &Weights) -> Result<[f64; 8], ScoreError> {
    let raw = weights.as_array();
    for factor in Factor::ALL {
        let value = raw[factor.index()];
        if !value.is_finite() || value < 0.0 {
            return Err(ScoreError::InvalidWeight { factor, value });
        }
    }
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Ok([1.0 / 8.0; 8]);
    }
    Ok(raw.map(|w| w / total))
}

// ---------------------------------------------------------------------------
// Factor values
// ---------------------------------------------------------------------------

/// Unweighted, unsigned value of each factor for one player.
pub fn factor_values(factor: &PlayerFactor, config: &ProfileConfig) -> [f64; 8] {
    let projection = factor.projection;

    let salary_value = match factor.salary {
        Some(s) if s > 0 => projection / (s as f64 / 1000.0),
        _ => 0.0,
    };

    let regression = if factor.regression_flag
        && config.eighty_twenty_enabled
        && config.regression_positions.contains(&factor.position)
    {
        REGRESSION_SHARE * projection.max(0.0)
    } else {
        0.0
    };

    let values = [
        projection,
        (factor.ceiling + factor.floor) / 2.0,
        factor.ownership_pct / 10.0,
        salary_value,
        factor.trend_adjustment,
        regression,
        (factor.vegas_itt_ratio - 1.0) * projection,
        factor.matchup_adjustment * projection,
    ];
    values.map(|v| if v.is_finite() { v } else { 0.0 })
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score one player under one profile.
pub fn score(factor: &PlayerFactor, profile: &WeightProfile) -> Result<PlayerScore, ScoreError> {
    let weights = normalize_weights(&profile.weights)?;
    Ok(score_normalized(factor, profile, &weights))
}

fn score_normalized(factor: &PlayerFactor, profile: &WeightProfile, weights: &[f64; 8]) -> PlayerScore {
    let values = factor_values(factor, &profile.config);
    let breakdown: BTreeMap<Factor, f64> = Factor::ALL
        .iter()
        .map(|f| (*f, f.sign() * weights[f.index()] * values[f.index()]))
        .collect();
    let smart_score = breakdown.values().sum();

    PlayerScore {
        player_key: factor.player_key.clone(),
        profile: profile.name.clone(),
        smart_score,
        breakdown,
        missing_flags: factor.missing_flags.clone(),
    }
}

/// Score a pool and sort it best first (ties by player key).
pub fn score_pool(
    factors: &[PlayerFactor],
    profile: &WeightProfile,
) -> Result<Vec<PlayerScore>, ScoreError> {
    let weights = normalize_weights(&profile.weights)?;
    let mut scores: Vec<PlayerScore> = factors
        .iter()
        .map(|f| score_normalized(f, profile, &weights))
        .collect();
    scores.sort_by(|a, b| {
        b.smart_score
            .total_cmp(&a.smart_score)
            .then_with(|| a.player_key.cmp(&b.player_key))
    });
    debug!(
        "scored {} players under profile '{}'",
        scores.len(),
        profile.name
    );
    Ok(scores)
}

/// Re-score a pool under a new profile and report per-player deltas.
///
/// The factors are reused as resolved under `old`. Weights and the W6 gate
/// (on/off and positions) follow `new`, but the regression threshold and the
/// projection source are baked into the factors, so a profile that changes
/// either is rejected.
pub fn rescore(
    factors: &[PlayerFactor],
    old: &WeightProfile,
    new: &WeightProfile,
) -> Result<Vec<ScoreDelta>, ScoreError> {
    let setting = if old.config.projection_source != new.config.projection_source {
        Some("projection_source")
    } else if old.config.regression_threshold != new.config.regression_threshold {
        Some("regression_threshold")
    } else {
        None
    };
    if let Some(setting) = setting {
        return Err(ScoreError::NeedsResolution {
            profile: new.name.clone(),
            setting,
        });
    }

    let before = score_pool(factors, old)?;
    let after = score_pool(factors, new)?;
    Ok(diff_scores(&before, &after))
}

/// Deltas for players present in both score lists, sorted by the size of
/// the change (largest first, ties by key).
pub fn diff_scores(old: &[PlayerScore], new: &[PlayerScore]) -> Vec<ScoreDelta> {
    let before: BTreeMap<&str, f64> = old
        .iter()
        .map(|s| (s.player_key.as_str(), s.smart_score))
        .collect();
    let mut deltas: Vec<ScoreDelta> = new
        .iter()
        .filter_map(|s| {
            before.get(s.player_key.as_str()).map(|old_score| ScoreDelta {
                player_key: s.player_key.clone(),
                old_score: *old_score,
                new_score: s.smart_score,
                delta: s.smart_score - old_score,
            })
        })
        .collect();
    deltas.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then_with(|| a.player_key.cmp(&b.player_key))
    });
    deltas
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
