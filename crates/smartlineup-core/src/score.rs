// Smart Score output for one player under one weight profile.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::factor::Factor;

/// One player's Smart Score with its per-factor breakdown.
///
/// `smart_score` is the sum of `breakdown` values taken in factor order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_key: String,
    pub profile: String,
    pub smart_score: f64,
    pub breakdown: BTreeMap<Factor, f64>,
    pub missing_flags: BTreeSet<Factor>,
}

impl PlayerScore {
    pub fn contribution(&self, factor: Factor) -> f64 {
        self.breakdown.get(&factor).copied().unwrap_or(0.0)
    }

    /// Re-sum the breakdown in factor order.
    pub fn breakdown_total(&self) -> f64 {
        self.breakdown.values().sum()
    }

    /// Whether the score was computed with at least one defaulted factor.
    pub fn computed_with_defaults(&self) -> bool {
        !self.missing_flags.is_empty()
    }
}
