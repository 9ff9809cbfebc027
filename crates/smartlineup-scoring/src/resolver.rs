// Factor resolution: raw provider data -> one PlayerFactor per player-week,
// with documented defaults substituted for anything missing.

use std::collections::BTreeSet;

use smartlineup_core::config::ResolverConfig;
use smartlineup_core::{Factor, PlayerFactor, ProfileConfig};
use tracing::debug;

use crate::policy::FactorDefaultPolicy;
use crate::provider::{GameLog, PlayerData, PlayerDataProvider};

/// Builds `PlayerFactor` bundles from a provider. Pure read + transform.
pub struct FactorResolver<'a, P: PlayerDataProvider + ?Sized> {
    provider: &'a P,
    config: ResolverConfig,
    policy: FactorDefaultPolicy,
    projection_source: Option<String>,
    regression_threshold: f64,
}

impl<'a, P: PlayerDataProvider + ?Sized> FactorResolver<'a, P> {
    pub fn new(provider: &'a P, config: &ResolverConfig) -> Self {
        let profile = ProfileConfig::default();
        Self {
            provider,
            config: config.clone(),
            policy: FactorDefaultPolicy::standard(),
            projection_source: profile.projection_source,
            regression_threshold: profile.regression_threshold,
        }
    }

    /// Use the preferred projection source and regression threshold of a
    /// weight profile.
    pub fn for_profile(mut self, profile: &ProfileConfig) -> Self {
        self.projection_source = profile.projection_source.clone();
        self.regression_threshold = profile.regression_threshold;
        self
    }

    pub fn with_policy(mut self, policy: FactorDefaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve one player for `week`. `None` only when the provider has no
    /// record of the player; missing inputs never fail.
    pub fn resolve(&self, player_key: &str, week: u32) -> Option<PlayerFactor> {
        let data = self.provider.player(player_key, week)?;
        Some(self.resolve_data(data, week))
    }

    /// Resolve every player the provider has for `week`.
    pub fn resolve_week(&self, week: u32) -> Vec<PlayerFactor> {
        let league_avg = self.league_average(week);
        self.provider
            .players(week)
            .into_iter()
            .map(|data| self.resolve_with_average(data, week, league_avg))
            .collect()
    }

    fn resolve_data(&self, data: &PlayerData, week: u32) -> PlayerFactor {
        self.resolve_with_average(data, week, self.league_average(week))
    }

    fn resolve_with_average(&self, data: &PlayerData, week: u32, league_avg: f64) -> PlayerFactor {
        let mut missing = BTreeSet::new();

        // -- W1 --
        let projection = match self.projection(data) {
            Some(p) => p,
            None => {
                missing.insert(Factor::Projection);
                self.policy.value(Factor::Projection)
            }
        };

        // -- W2 --
        let spread = self.policy.value(Factor::CeilingFloor);
        let ceiling = finite(data.ceiling);
        let floor = finite(data.floor);
        if ceiling.is_none() || floor.is_none() {
            missing.insert(Factor::CeilingFloor);
        }
        let mut ceiling = ceiling.unwrap_or(projection * (1.0 + spread));
        let mut floor = floor.unwrap_or(projection * (1.0 - spread));
        if floor > ceiling {
            std::mem::swap(&mut ceiling, &mut floor);
        }

        // -- W3 --
        let ownership_pct = match finite(data.ownership_pct) {
            Some(o) => o.clamp(0.0, 100.0),
            None => {
                missing.insert(Factor::Ownership);
                self.policy.value(Factor::Ownership)
            }
        };

        // -- W4 --
        let salary = data.salary.filter(|s| *s > 0);
        if salary.is_none() {
            missing.insert(Factor::SalaryValue);
        }

        // -- W5 / W6 --
        let logs = prior_games(&data.game_logs, week);
        let trend_adjustment = match self.trend(&logs) {
            Some(t) => t,
            None => {
                missing.insert(Factor::Trend);
                self.policy.value(Factor::Trend)
            }
        };
        let regression_flag = match logs.last() {
            Some(last) => last.fantasy_points > self.regression_threshold,
            None => {
                missing.insert(Factor::Regression);
                self.policy.value(Factor::Regression) != 0.0
            }
        };

        // -- W7 --
        let vegas_itt_ratio = match self
            .provider
            .implied_total(&data.team, week)
            .filter(|t| t.is_finite() && *t > 0.0)
        {
            Some(itt) if league_avg > 0.0 => itt / league_avg,
            _ => {
                missing.insert(Factor::Vegas);
                self.policy.value(Factor::Vegas)
            }
        };

        // -- W8 --
        let matchup_adjustment = match data.opponent_def_rank.filter(|r| *r > 0) {
            Some(rank) => self.matchup_bucket(rank),
            None => {
                missing.insert(Factor::Matchup);
                self.policy.value(Factor::Matchup)
            }
        };

        if !missing.is_empty() {
            debug!(
                "{} week {}: defaulted {:?}",
                data.player_key, week, missing
            );
        }

        PlayerFactor {
            player_key: data.player_key.clone(),
            name: data.name.clone(),
            position: data.position,
            team: data.team.clone(),
            opponent: data.opponent.clone(),
            availability: data.availability,
            week,
            projection,
            ceiling,
            floor,
            ownership_pct,
            salary,
            trend_adjustment,
            regression_flag,
            vegas_itt_ratio,
            matchup_adjustment,
            missing_flags: missing,
        }
    }

    /// Preferred source if present, otherwise the mean of all sources.
    fn projection(&self, data: &PlayerData) -> Option<f64> {
        if let Some(source) = &self.projection_source {
            if let Some(p) = data.projections.get(source).filter(|p| p.is_finite()) {
                return Some(*p);
            }
        }
        let values: Vec<f64> = data
            .projections
            .values()
            .copied()
            .filter(|p| p.is_finite())
            .collect();
        mean(&values)
    }

    /// Recent-window mean minus full-history mean, clamped.
    fn trend(&self, logs: &[GameLog]) -> Option<f64> {
        if logs.len() < self.config.min_games.max(1) {
            return None;
        }
        let window = self.config.trend_window.clamp(1, logs.len());
        let points: Vec<f64> = logs.iter().map(|g| g.fantasy_points).collect();
        let recent = mean(&points[points.len() - window..])?;
        let all = mean(&points)?;
        let clamp = self.config.trend_clamp.abs();
        Some((recent - all).clamp(-clamp, clamp))
    }

    fn matchup_bucket(&self, rank: u32) -> f64 {
        if rank <= self.config.tough_rank_max {
            self.config.tough_adjustment
        } else if rank >= self.config.soft_rank_min {
            self.config.soft_adjustment
        } else {
            self.policy.value(Factor::Matchup)
        }
    }

    /// Average implied total over teams with a posted line this week, or
    /// the configured league average when none are posted.
    fn league_average(&self, week: u32) -> f64 {
        let totals: Vec<f64> = self
            .provider
            .implied_totals(week)
            .into_iter()
            .filter(|t| t.is_finite() && *t > 0.0)
            .collect();
        mean(&totals).unwrap_or(self.config.league_avg_implied_total)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Games played before `week`, oldest first, with non-finite points dropped.
fn prior_games(logs: &[GameLog], week: u32) -> Vec<GameLog> {
    let mut prior: Vec<GameLog> = logs
        .iter()
        .filter(|g| g.week < week && g.fantasy_points.is_finite())
        .copied()
        .collect();
    prior.sort_by_key(|g| g.week);
    prior
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
