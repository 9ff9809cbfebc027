// Showdown captain selection, applied to each solved lineup.

use std::collections::{BTreeMap, BTreeSet};

use smartlineup_core::roster::CAPTAIN_MULTIPLIER;
use smartlineup_core::{CaptainAssignment, Lineup, LineupSet, PlayerScore, SlotKind, Warning};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CaptainError {
    #[error("locked captain {player_key} costs {salary} at 1.5x, over the {cap} salary cap")]
    LockedOverCap {
        player_key: String,
        salary: f64,
        cap: u32,
    },

    #[error("no rostered player can be promoted to captain under the {cap} salary cap")]
    NoFeasibleCaptain { cap: u32 },
}

/// Pick the captain for one lineup.
///
/// A locked captain on the roster wins outright once its 1.5x salary is
/// checked against the cap. Otherwise the rostered player with the best
/// Smart Score per dollar whose promotion keeps the lineup under the cap is
/// chosen; ties go to the higher Smart Score, then the lower player key.
///
/// Players in `excluded` (captains that hit their ceiling) are skipped unless
/// every feasible rostered player is excluded. A locked captain ignores it.
pub fn select_captain(
    lineup_index: usize,
    lineup: &Lineup,
    scores: &[PlayerScore],
    locked: Option<&str>,
    excluded: &BTreeSet<String>,
    salary_cap: u32,
) -> Result<CaptainAssignment, CaptainError> {
    let by_key: BTreeMap<&str, f64> = scores
        .iter()
        .map(|s| (s.player_key.as_str(), s.smart_score))
        .collect();
    let base_total: f64 = lineup.slots.iter().map(|s| s.base_salary as f64).sum();
    let promoted_total =
        |salary: u32| base_total + (CAPTAIN_MULTIPLIER - 1.0) * salary as f64;

    if let Some(key) = locked {
        if let Some(slot) = lineup.slots.iter().find(|s| s.player_key == key) {
            if promoted_total(slot.base_salary) > salary_cap as f64 {
                return Err(CaptainError::LockedOverCap {
                    player_key: key.to_string(),
                    salary: slot.base_salary as f64 * CAPTAIN_MULTIPLIER,
                    cap: salary_cap,
                });
            }
            return Ok(CaptainAssignment {
                lineup_index,
                player_key: key.to_string(),
                is_locked: true,
            });
        }
    }

    let feasible: Vec<_> = lineup
        .slots
        .iter()
        .filter(|s| promoted_total(s.base_salary) <= salary_cap as f64)
        .map(|s| {
            let score = by_key
                .get(s.player_key.as_str())
                .copied()
                .unwrap_or(s.base_score);
            let value = score / s.base_salary.max(1) as f64;
            (s, score, value)
        })
        .collect();

    let pick = |allow_excluded: bool| {
        feasible
            .iter()
            .filter(|(s, _, _)| allow_excluded || !excluded.contains(&s.player_key))
            .max_by(|(a, a_score, a_value), (b, b_score, b_value)| {
                a_value
                    .total_cmp(b_value)
                    .then_with(|| a_score.total_cmp(b_score))
                    .then_with(|| b.player_key.cmp(&a.player_key))
            })
    };

    match pick(false).or_else(|| pick(true)) {
        Some((slot, _, _)) => Ok(CaptainAssignment {
            lineup_index,
            player_key: slot.player_key.clone(),
            is_locked: false,
        }),
        None => Err(CaptainError::NoFeasibleCaptain { cap: salary_cap }),
    }
}

/// Return a copy of `lineup` with `player_key` in the captain slot and the
/// previous captain moved to FLEX. `None` if the player is not rostered.
pub fn apply_captain(lineup: &Lineup, player_key: &str) -> Option<Lineup> {
    if !lineup.contains(player_key) {
        return None;
    }
    let slots = lineup
        .slots
        .iter()
        .cloned()
        .map(|mut s| {
            if s.player_key == player_key {
                s.slot = SlotKind::Cpt;
                s.multiplier = CAPTAIN_MULTIPLIER;
            } else if s.slot == SlotKind::Cpt {
                s.slot = SlotKind::Flex;
                s.multiplier = 1.0;
            }
            s
        })
        .collect();
    Some(Lineup::new(slots))
}

/// Advisory warning when a set uses too few distinct captains. The target
/// never exceeds the number of lineups.
pub fn captain_diversity_warning(set: &LineupSet, target_min: usize) -> Option<Warning> {
    if set.captains.is_empty() {
        return None;
    }
    let target = target_min.min(set.lineups.len());
    let distinct = set.distinct_captains();
    (distinct < target).then_some(Warning::CaptainDiversity {
        distinct,
        target_min: target,
    })
}
