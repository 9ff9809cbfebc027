// Score engine: factor resolution, default policy, weighted Smart Scores and
// player pool ingestion.

pub mod engine;
pub mod ingest;
pub mod policy;
pub mod provider;
pub mod resolver;

use smartlineup_core::config::ResolverConfig;
use smartlineup_core::{PlayerFactor, PlayerScore, WeightProfile};
use tracing::{info, warn};

pub use engine::{rescore, score, score_pool, ScoreDelta, ScoreError};
pub use policy::{FactorDefault, FactorDefaultPolicy};
pub use provider::{GameLog, InMemoryProvider, PlayerData, PlayerDataProvider};
pub use resolver::FactorResolver;

/// Resolved factors and scores for one week under one profile.
#[derive(Debug, Clone)]
pub struct WeekScores {
    pub week: u32,
    pub factors: Vec<PlayerFactor>,
    /// Sorted best first.
    pub scores: Vec<PlayerScore>,
}

/// Resolve and score every player the provider has for `week`.
pub fn score_week<P: PlayerDataProvider + ?Sized>(
    provider: &P,
    week: u32,
    profile: &WeightProfile,
    resolver_config: &ResolverConfig,
) -> Result<WeekScores, ScoreError> {
    let factors = FactorResolver::new(provider, resolver_config)
        .for_profile(&profile.config)
        .resolve_week(week);

    let defaulted = factors.iter().filter(|f| f.has_defaults()).count();
    if defaulted > 0 {
        warn!(
            "week {}: {} of {} players scored with defaulted factors",
            week,
            defaulted,
            factors.len()
        );
    }

    let scores = score_pool(&factors, profile)?;
    info!(
        "week {}: scored {} players with profile '{}'",
        week,
        scores.len(),
        profile.name
    );
    Ok(WeekScores {
        week,
        factors,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartlineup_core::{Factor, Position, Weights};

    fn pool() -> InMemoryProvider {
        let mut provider = InMemoryProvider::new();
        let mut star = PlayerData::new("star", "Star", Position::WideReceiver, "KC", 4);
        star.salary = Some(8000);
        star.projections.insert("base".into(), 22.0);
        star.game_logs = vec![
            GameLog { week: 1, fantasy_points: 18.0 },
            GameLog { week: 2, fantasy_points: 20.0 },
            GameLog { week: 3, fantasy_points: 22.0 },
        ];
        provider.insert_player(star);

        // Zero games played: trend and regression fall back to defaults.
        let mut rookie = PlayerData::new("rookie", "Rookie", Position::RunningBack, "KC", 4);
        rookie.salary = Some(4000);
        rookie.projections.insert("base".into(), 9.0);
        provider.insert_player(rookie);
        provider
    }

    #[test]
    fn score_week_scores_every_player() {
        let result = score_week(&pool(), 4, &WeightProfile::default(), &ResolverConfig::default())
            .unwrap();
        assert_eq!(result.factors.len(), 2);
        assert_eq!(result.scores.len(), 2);
        assert_eq!(result.scores[0].player_key, "star");
    }

    #[test]
    fn zero_games_scores_finite_with_trend_flagged() {
        let result = score_week(&pool(), 4, &WeightProfile::default(), &ResolverConfig::default())
            .unwrap();
        let rookie = result
            .scores
            .iter()
            .find(|s| s.player_key == "rookie")
            .unwrap();
        assert!(rookie.smart_score.is_finite());
        assert!(rookie.missing_flags.contains(&Factor::Trend));
        assert!(rookie.missing_flags.contains(&Factor::Regression));
    }

    #[test]
    fn projection_only_profile_ranks_max_projection_first() {
        let mut provider = pool();
        // Cheap, low-owned, great matchup, but a lower projection.
        let mut value = PlayerData::new("value", "Value", Position::TightEnd, "BUF", 4);
        value.salary = Some(2500);
        value.projections.insert("base".into(), 21.0);
        value.ownership_pct = Some(1.0);
        value.opponent_def_rank = Some(32);
        provider.insert_player(value);
        provider.set_implied_total("BUF", 4, 31.0);

        let profile = WeightProfile::new("proj", Weights::projection_only());
        let result = score_week(&provider, 4, &profile, &ResolverConfig::default()).unwrap();
        let max_projection = result
            .factors
            .iter()
            .max_by(|a, b| a.projection.total_cmp(&b.projection))
            .unwrap();
        assert_eq!(result.scores[0].player_key, max_projection.player_key);
        assert_eq!(result.scores[0].player_key, "star");
    }

    #[test]
    fn invalid_weight_fails_the_week() {
        let profile = WeightProfile::new("bad", Weights::default().with(Factor::Matchup, -1.0));
        let err = score_week(&pool(), 4, &profile, &ResolverConfig::default()).unwrap_err();
        assert!(matches!(err, ScoreError::InvalidWeight { factor: Factor::Matchup, .. }));
    }
}
