// Lineups, lineup sets, captain assignments and the structured warnings that
// travel with a still-usable result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::factor::Factor;
use crate::position::{Position, SlotKind};

/// A player placed in one roster slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSlot {
    pub slot: SlotKind,
    pub player_key: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    /// Listed salary before any captain multiplier.
    pub base_salary: u32,
    pub base_score: f64,
    /// 1.5 on a captain slot, otherwise 1.0.
    pub multiplier: f64,
}

impl LineupSlot {
    pub fn effective_salary(&self) -> f64 {
        self.base_salary as f64 * self.multiplier
    }

    pub fn effective_score(&self) -> f64 {
        self.base_score * self.multiplier
    }
}

/// One complete roster assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub slots: Vec<LineupSlot>,
    pub total_salary: f64,
    pub total_score: f64,
}

impl Lineup {
    /// Build a lineup and compute its totals. Slots are ordered by
    /// `SlotKind::sort_order()` then player key.
    pub fn new(mut slots: Vec<LineupSlot>) -> Self {
        slots.sort_by(|a, b| {
            a.slot
                .sort_order()
                .cmp(&b.slot.sort_order())
                .then_with(|| a.player_key.cmp(&b.player_key))
        });
        let mut lineup = Self {
            slots,
            total_salary: 0.0,
            total_score: 0.0,
        };
        lineup.recompute_totals();
        lineup
    }

    pub fn recompute_totals(&mut self) {
        self.total_salary = self.slots.iter().map(|s| s.effective_salary()).sum();
        self.total_score = self.slots.iter().map(|s| s.effective_score()).sum();
    }

    /// Distinct player keys in this lineup.
    pub fn player_keys(&self) -> BTreeSet<&str> {
        self.slots.iter().map(|s| s.player_key.as_str()).collect()
    }

    pub fn contains(&self, player_key: &str) -> bool {
        self.slots.iter().any(|s| s.player_key == player_key)
    }

    /// Number of players shared with another lineup.
    pub fn shared_with(&self, other: &Lineup) -> usize {
        let mine = self.player_keys();
        other
            .player_keys()
            .iter()
            .filter(|k| mine.contains(*k))
            .count()
    }

    /// Whether any player key occupies two slots.
    pub fn has_duplicate_player(&self) -> bool {
        self.player_keys().len() != self.slots.len()
    }

    /// The player currently in the captain slot, if any.
    pub fn captain_slot(&self) -> Option<&LineupSlot> {
        self.slots.iter().find(|s| s.slot == SlotKind::Cpt)
    }
}

/// Captain chosen for one lineup of a showdown set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptainAssignment {
    pub lineup_index: usize,
    pub player_key: String,
    pub is_locked: bool,
}

/// Why a lineup set holds fewer lineups than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallReason {
    /// Diversity constraints over-constrained the pool after relaxation.
    Diversification,
    /// The wall-clock budget ran out.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub requested: usize,
    pub produced: usize,
    pub reason: ShortfallReason,
}

impl Shortfall {
    pub fn missing(&self) -> usize {
        self.requested.saturating_sub(self.produced)
    }
}

/// Non-fatal conditions reported alongside a usable result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    MissingFactors {
        player_key: String,
        factors: BTreeSet<Factor>,
    },
    DiversificationShortfall {
        requested: usize,
        produced: usize,
        relaxations: usize,
    },
    SolverTimeout {
        elapsed_ms: u64,
        produced: usize,
    },
    CaptainDiversity {
        distinct: usize,
        target_min: usize,
    },
    PlayerDropped {
        player_key: String,
        reason: String,
    },
}

/// An ordered, immutable batch of lineups from one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSet {
    pub template: String,
    pub salary_cap: u32,
    pub requested: usize,
    pub lineups: Vec<Lineup>,
    /// Showdown only: one entry per lineup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captains: Vec<CaptainAssignment>,
    pub shortfall: Option<Shortfall>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl LineupSet {
    pub fn len(&self) -> usize {
        self.lineups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineups.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.shortfall.is_some()
    }

    /// Appearance count per player across the set.
    pub fn exposure_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for lineup in &self.lineups {
            for key in lineup.player_keys() {
                *counts.entry(key.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of distinct captains across the set.
    pub fn distinct_captains(&self) -> usize {
        self.captains
            .iter()
            .map(|c| c.player_key.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}
