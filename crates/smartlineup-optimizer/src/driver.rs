// Solver driver: repeated ILP solves producing a diverse lineup set.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smartlineup_core::config::{ExposureConfig, OptimizerConfig};
use smartlineup_core::{
    Lineup, LineupSet, LineupSlot, PlayerScore, Shortfall, ShortfallReason, Warning,
};
use tracing::{debug, info, warn};

use crate::captain::{apply_captain, captain_diversity_warning, select_captain, CaptainError};
use crate::constraints::ConstraintSet;
use crate::diversification::DiversificationState;
use crate::solver::{IlpProblem, IlpSolution, Solver, SolverError};

// ---------------------------------------------------------------------------
// Options and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerOptions {
    /// Every pair of lineups differs by at least this many players.
    pub min_unique_players: usize,
    /// Overlap relaxations allowed across the whole set. The budget is
    /// shared, so relaxations spent on early lineups leave none for later
    /// ones.
    pub max_relaxations: usize,
    /// Wall-clock budget, checked between solves. A solve already running
    /// is never interrupted, so a run can overshoot by up to one solve, and
    /// the first lineup is always attempted even with a zero budget.
    pub timeout: Duration,
    /// Scale of the seeded per-player jitter added to the objective.
    pub randomness: f64,
    pub seed: u64,
    /// Objective points removed per 10% ownership.
    pub ownership_leverage: f64,
    pub exposure: ExposureConfig,
    /// Per-player max exposure fractions, overriding the tiers.
    pub max_exposure: BTreeMap<String, f64>,
    /// Per-player min exposure fractions.
    pub min_exposure: BTreeMap<String, f64>,
    /// Distinct captains wanted across a showdown set. Each captain is held
    /// to `ceil(lineups / target)` appearances while alternatives exist.
    pub captain_target_min: usize,
}

impl OptimizerOptions {
    pub fn from_config(optimizer: &OptimizerConfig, exposure: &ExposureConfig) -> Self {
        Self {
            min_unique_players: optimizer.min_unique_players,
            max_relaxations: optimizer.max_relaxations,
            timeout: Duration::from_secs(optimizer.timeout_secs),
            randomness: optimizer.randomness,
            seed: optimizer.seed,
            ownership_leverage: optimizer.ownership_leverage,
            exposure: exposure.clone(),
            max_exposure: BTreeMap::new(),
            min_exposure: BTreeMap::new(),
            captain_target_min: optimizer.captain_target_min,
        }
    }
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self::from_config(&OptimizerConfig::default(), &ExposureConfig::default())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("no legal lineup exists for template `{template}` with this pool and rules")]
    InfeasibleTemplate { template: String },

    #[error("at least one lineup must be requested")]
    NoLineupsRequested,

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Captain(#[from] CaptainError),
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Generate up to `lineup_count` lineups, best first.
///
/// The first solve failing means no legal lineup exists at all. Later
/// failures loosen the newest overlap cut and retry; once relaxation is
/// exhausted, or the timeout passes, the lineups found so far are returned
/// with a shortfall. A lineup is never repeated.
pub fn optimize(
    set: &ConstraintSet,
    scores: &[PlayerScore],
    lineup_count: usize,
    options: &OptimizerOptions,
    solver: &dyn Solver,
) -> Result<LineupSet, OptimizeError> {
    if lineup_count == 0 {
        return Err(OptimizeError::NoLineupsRequested);
    }

    let by_key: BTreeMap<&str, &PlayerScore> =
        scores.iter().map(|s| (s.player_key.as_str(), s)).collect();
    let base_scores: Vec<f64> = set
        .candidates
        .iter()
        .map(|c| by_key.get(c.player_key.as_str()).map_or(0.0, |s| s.smart_score))
        .collect();

    let (max_counts, min_counts) = exposure_limits(set, &base_scores, lineup_count, options);
    let mut state = DiversificationState::new(
        lineup_count,
        set.roster_size(),
        options.min_unique_players,
        options.max_relaxations,
    )
    .with_exposure(max_counts, min_counts)
    .with_captain_target(options.captain_target_min);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let started = Instant::now();
    let mut lineups: Vec<Lineup> = Vec::new();
    let mut captains = Vec::new();
    let mut shortfall = None;
    let mut warnings = Vec::new();

    info!(
        "optimizing {} lineups for {} with {} solver",
        lineup_count,
        set.template.name,
        solver.name()
    );

    while !state.is_complete() {
        if state.produced() > 0 && started.elapsed() >= options.timeout {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            warn!(
                "timeout after {}ms with {} of {} lineups",
                elapsed_ms,
                state.produced(),
                lineup_count
            );
            shortfall = Some(ShortfallReason::Timeout);
            warnings.push(Warning::SolverTimeout {
                elapsed_ms,
                produced: state.produced(),
            });
            break;
        }

        let objective = objective(set, &base_scores, options, &mut rng);
        let extra = state.constraints(set);
        let problem = IlpProblem::new(objective)
            .with(set.constraints.iter())
            .with(extra.iter());
        let solution = solver.solve_ilp(&problem)?;

        let candidate = if solution.is_optimal() {
            let lineup = extract_lineup(set, &base_scores, &solution)?;
            let players: BTreeSet<String> =
                lineup.player_keys().into_iter().map(str::to_string).collect();
            (!state.is_duplicate(&players)).then_some((lineup, players))
        } else {
            None
        };

        match candidate {
            Some((mut lineup, players)) => {
                if set.template.has_captain() {
                    let assignment = select_captain(
                        lineups.len(),
                        &lineup,
                        scores,
                        set.locked_captain.as_deref(),
                        &state.saturated_captains(),
                        set.template.salary_cap,
                    )?;
                    if let Some(swapped) = apply_captain(&lineup, &assignment.player_key) {
                        lineup = swapped;
                    }
                    state.record_captain(&assignment.player_key);
                    captains.push(assignment);
                }
                debug!(
                    "lineup {}: score {:.2}, salary {:.0}",
                    lineups.len() + 1,
                    lineup.total_score,
                    lineup.total_salary
                );
                state.record(players);
                lineups.push(lineup);
            }
            None if state.produced() == 0 => {
                return Err(OptimizeError::InfeasibleTemplate {
                    template: set.template.name.clone(),
                });
            }
            None => {
                if state.relax() {
                    debug!("relaxed overlap cut ({} so far)", state.relaxations());
                    continue;
                }
                warn!(
                    "diversification exhausted: {} of {} lineups after {} relaxations",
                    state.produced(),
                    lineup_count,
                    state.relaxations()
                );
                shortfall = Some(ShortfallReason::Diversification);
                warnings.push(Warning::DiversificationShortfall {
                    requested: lineup_count,
                    produced: state.produced(),
                    relaxations: state.relaxations(),
                });
                break;
            }
        }
    }

    warnings.extend(missing_factor_warnings(&lineups, &by_key));
    warnings.extend(set.dropped.iter().map(|(key, reason)| Warning::PlayerDropped {
        player_key: key.clone(),
        reason: reason.clone(),
    }));

    let mut result = LineupSet {
        template: set.template.name.clone(),
        salary_cap: set.template.salary_cap,
        requested: lineup_count,
        lineups,
        captains,
        shortfall: shortfall.map(|reason| Shortfall {
            requested: lineup_count,
            produced: state.produced(),
            reason,
        }),
        warnings,
    };
    if let Some(w) = captain_diversity_warning(&result, options.captain_target_min) {
        warn!("captain diversity below target: {:?}", w);
        result.warnings.push(w);
    }

    info!(
        "produced {} of {} lineups in {}ms",
        result.len(),
        lineup_count,
        started.elapsed().as_millis()
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Objective coefficient per variable: slot-multiplied Smart Score, minus
/// the ownership leverage term, plus seeded jitter.
fn objective(
    set: &ConstraintSet,
    base_scores: &[f64],
    options: &OptimizerOptions,
    rng: &mut StdRng,
) -> Vec<f64> {
    let jitter: Vec<f64> = if options.randomness > 0.0 {
        (0..set.candidates.len())
            .map(|_| options.randomness * rng.gen_range(-1.0..=1.0))
            .collect()
    } else {
        vec![0.0; set.candidates.len()]
    };

    set.vars
        .iter()
        .map(|v| {
            let c = &set.candidates[v.candidate];
            (base_scores[v.candidate] + jitter[v.candidate]) * v.multiplier
                - options.ownership_leverage * c.ownership_pct / 10.0
        })
        .collect()
}

fn extract_lineup(
    set: &ConstraintSet,
    base_scores: &[f64],
    solution: &IlpSolution,
) -> Result<Lineup, SolverError> {
    let slots: Vec<LineupSlot> = solution
        .selected()
        .into_iter()
        .filter_map(|i| set.vars.get(i))
        .map(|v| {
            let c = &set.candidates[v.candidate];
            LineupSlot {
                slot: v.slot,
                player_key: c.player_key.clone(),
                name: c.name.clone(),
                position: c.position,
                team: c.team.clone(),
                base_salary: c.salary,
                base_score: base_scores[v.candidate],
                multiplier: v.multiplier,
            }
        })
        .collect();

    let lineup = Lineup::new(slots);
    if lineup.slots.len() != set.roster_size() {
        return Err(SolverError::InvalidSolution(format!(
            "{} players selected for a {}-player roster",
            lineup.slots.len(),
            set.roster_size()
        )));
    }
    if lineup.has_duplicate_player() {
        return Err(SolverError::InvalidSolution(
            "a player fills two slots".into(),
        ));
    }
    Ok(lineup)
}

/// Appearance ceilings and floors, in lineups. Ceilings come from the
/// Smart Score percentile tiers unless overridden per player; locked players
/// have none. Every ceiling allows at least one appearance.
pub fn exposure_limits(
    set: &ConstraintSet,
    base_scores: &[f64],
    lineup_count: usize,
    options: &OptimizerOptions,
) -> (BTreeMap<String, usize>, BTreeMap<String, usize>) {
    let n = set.candidates.len();
    let mut max_counts = BTreeMap::new();
    let mut min_counts = BTreeMap::new();

    for (i, c) in set.candidates.iter().enumerate() {
        let key = &c.player_key;
        let min = options
            .min_exposure
            .get(key)
            .map(|f| ((f.clamp(0.0, 1.0) * lineup_count as f64) - 1e-9).ceil().max(0.0) as usize)
            .unwrap_or(0);
        if min > 0 {
            min_counts.insert(key.clone(), min);
        }

        if set.locked.contains(key) || set.locked_captain.as_ref() == Some(key) {
            continue;
        }
        let frac = options.max_exposure.get(key).copied().unwrap_or_else(|| {
            let below = base_scores.iter().filter(|s| **s < base_scores[i]).count();
            let percentile = if n > 0 { below as f64 / n as f64 } else { 0.0 };
            options.exposure.max_for_percentile(percentile)
        });
        let max = ((frac * lineup_count as f64) + 1e-9).floor() as usize;
        max_counts.insert(key.clone(), max.max(1).max(min));
    }

    (max_counts, min_counts)
}

fn missing_factor_warnings(
    lineups: &[Lineup],
    by_key: &BTreeMap<&str, &PlayerScore>,
) -> Vec<Warning> {
    let rostered: BTreeSet<&str> = lineups
        .iter()
        .flat_map(|l| l.slots.iter().map(|s| s.player_key.as_str()))
        .collect();
    rostered
        .into_iter()
        .filter_map(|key| by_key.get(key))
        .filter(|s| s.computed_with_defaults())
        .map(|s| Warning::MissingFactors {
            player_key: s.player_key.clone(),
            factors: s.missing_flags.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
