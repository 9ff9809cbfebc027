// Cross-lineup state threaded through the solve loop: accepted lineups,
// appearance counts, exposure bans, overlap cuts and captain counts.

use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::{ConstraintKind, ConstraintSet, LinearConstraint, Sense};

/// Overlap cut against one accepted lineup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiversityCut {
    pub lineup: usize,
    /// Players a new lineup may share with that lineup.
    pub max_shared: usize,
}

/// Everything the driver learns between solves. Owned by one optimize call
/// and passed explicitly to each step so the loop can be replayed in tests.
#[derive(Debug, Clone)]
pub struct DiversificationState {
    requested: usize,
    roster_size: usize,
    max_overlap: usize,
    max_relaxations: usize,
    relaxations: usize,
    accepted: Vec<BTreeSet<String>>,
    counts: BTreeMap<String, usize>,
    max_counts: BTreeMap<String, usize>,
    min_counts: BTreeMap<String, usize>,
    banned: BTreeSet<String>,
    cuts: Vec<DiversityCut>,
    captain_counts: BTreeMap<String, usize>,
    captain_ceiling: Option<usize>,
}

impl DiversificationState {
    /// `min_unique` is the number of players every pair of lineups must
    /// differ by. It is raised to 1 so lineups can never repeat.
    ///
    /// `max_relaxations` is one budget for the whole set, not per lineup:
    /// once early lineups spend it, later ones get no relaxation at all.
    pub fn new(requested: usize, roster_size: usize, min_unique: usize, max_relaxations: usize) -> Self {
        let max_overlap = roster_size.saturating_sub(min_unique.max(1));
        Self {
            requested,
            roster_size,
            max_overlap,
            max_relaxations,
            relaxations: 0,
            accepted: Vec::new(),
            counts: BTreeMap::new(),
            max_counts: BTreeMap::new(),
            min_counts: BTreeMap::new(),
            banned: BTreeSet::new(),
            cuts: Vec::new(),
            captain_counts: BTreeMap::new(),
            captain_ceiling: None,
        }
    }

    /// Cap each captain at `ceil(requested / target_min)` lineups, so a full
    /// set has at least `target_min` distinct captains when the rosters
    /// allow it. A zero target leaves captains uncapped.
    pub fn with_captain_target(mut self, target_min: usize) -> Self {
        self.captain_ceiling = (target_min > 0 && self.requested > 0)
            .then(|| self.requested.div_ceil(target_min));
        self
    }

    /// Per-player appearance ceilings and floors, in lineups.
    pub fn with_exposure(
        mut self,
        max_counts: BTreeMap<String, usize>,
        min_counts: BTreeMap<String, usize>,
    ) -> Self {
        self.max_counts = max_counts;
        self.min_counts = min_counts;
        self
    }

    pub fn accepted(&self) -> &[BTreeSet<String>] {
        &self.accepted
    }

    pub fn produced(&self) -> usize {
        self.accepted.len()
    }

    pub fn remaining(&self) -> usize {
        self.requested.saturating_sub(self.accepted.len())
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn count(&self, player_key: &str) -> usize {
        self.counts.get(player_key).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn is_banned(&self, player_key: &str) -> bool {
        self.banned.contains(player_key)
    }

    pub fn cuts(&self) -> &[DiversityCut] {
        &self.cuts
    }

    pub fn relaxations(&self) -> usize {
        self.relaxations
    }

    pub fn captain_ceiling(&self) -> Option<usize> {
        self.captain_ceiling
    }

    pub fn record_captain(&mut self, player_key: &str) {
        *self.captain_counts.entry(player_key.to_string()).or_insert(0) += 1;
    }

    /// Captains already used as often as the ceiling allows.
    pub fn saturated_captains(&self) -> BTreeSet<String> {
        let Some(ceiling) = self.captain_ceiling else {
            return BTreeSet::new();
        };
        self.captain_counts
            .iter()
            .filter(|(_, count)| **count >= ceiling)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Whether `players` repeats an accepted lineup.
    pub fn is_duplicate(&self, players: &BTreeSet<String>) -> bool {
        self.accepted.iter().any(|a| a == players)
    }

    /// Record an accepted lineup: add its overlap cut, bump counts and ban
    /// anyone who reached their ceiling.
    pub fn record(&mut self, players: BTreeSet<String>) {
        let lineup = self.accepted.len();
        for key in &players {
            let count = self.counts.entry(key.clone()).or_insert(0);
            *count += 1;
            if let Some(max) = self.max_counts.get(key) {
                if *count >= *max {
                    self.banned.insert(key.clone());
                }
            }
        }
        self.cuts.push(DiversityCut {
            lineup,
            max_shared: self.max_overlap,
        });
        self.accepted.push(players);
    }

    /// Loosen the most recent cut that can still be loosened by one shared
    /// player. Returns false once the set-wide relaxation budget is spent or
    /// no cut can grow without allowing a repeat.
    pub fn relax(&mut self) -> bool {
        if self.relaxations >= self.max_relaxations {
            return false;
        }
        let limit = self.roster_size.saturating_sub(1);
        match self.cuts.iter_mut().rev().find(|c| c.max_shared < limit) {
            Some(cut) => {
                cut.max_shared += 1;
                self.relaxations += 1;
                true
            }
            None => false,
        }
    }

    /// Players whose floor can only be met if they appear in every
    /// remaining lineup.
    pub fn pinned(&self) -> Vec<&str> {
        let remaining = self.remaining();
        self.min_counts
            .iter()
            .filter(|(key, min)| {
                let deficit = min.saturating_sub(self.count(key));
                deficit > 0 && deficit >= remaining && !self.banned.contains(*key)
            })
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Rows to add on top of the base constraint set for the next solve.
    pub fn constraints(&self, set: &ConstraintSet) -> Vec<LinearConstraint> {
        let mut rows = Vec::new();

        for cut in &self.cuts {
            let players = &self.accepted[cut.lineup];
            rows.push(LinearConstraint::new(
                ConstraintKind::Diversity { lineup: cut.lineup },
                set.player_terms(players.iter().map(String::as_str)),
                Sense::LessEqual,
                cut.max_shared as f64,
            ));
        }

        for key in &self.banned {
            if set.locked.contains(key) || set.locked_captain.as_ref() == Some(key) {
                continue;
            }
            let terms = set.player_terms([key.as_str()]);
            if !terms.is_empty() {
                rows.push(LinearConstraint::new(
                    ConstraintKind::ExposureBan(key.clone()),
                    terms,
                    Sense::LessEqual,
                    0.0,
                ));
            }
        }

        for key in self.pinned() {
            let terms = set.player_terms([key]);
            if !terms.is_empty() {
                rows.push(LinearConstraint::new(
                    ConstraintKind::ExposurePin(key.to_string()),
                    terms,
                    Sense::Equal,
                    1.0,
                ));
            }
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overlap_never_reaches_roster_size() {
        let state = DiversificationState::new(5, 3, 0, 3);
        assert_eq!(state.max_overlap, 2);
        let state = DiversificationState::new(5, 3, 2, 3);
        assert_eq!(state.max_overlap, 1);
    }

    #[test]
    fn record_counts_and_bans_at_ceiling() {
        let mut state = DiversificationState::new(4, 2, 1, 3)
            .with_exposure(BTreeMap::from([("a".to_string(), 2)]), BTreeMap::new());
        state.record(keys(&["a", "b"]));
        assert!(!state.is_banned("a"));
        state.record(keys(&["a", "c"]));
        assert!(state.is_banned("a"));
        assert_eq!(state.count("a"), 2);
        assert_eq!(state.count("b"), 1);
        assert_eq!(state.remaining(), 2);
        assert_eq!(state.cuts().len(), 2);
        assert!(state.is_duplicate(&keys(&["b", "a"])));
    }

    #[test]
    fn relax_targets_latest_cut_and_respects_budget() {
        let mut state = DiversificationState::new(10, 3, 2, 2);
        state.record(keys(&["a", "b", "c"]));
        state.record(keys(&["a", "d", "e"]));
        assert!(state.relax());
        assert_eq!(state.cuts()[1].max_shared, 2);
        assert_eq!(state.cuts()[0].max_shared, 1);
        // latest cut is at its limit, so the older one loosens next
        assert!(state.relax());
        assert_eq!(state.cuts()[0].max_shared, 2);
        // budget spent
        assert!(!state.relax());
        assert_eq!(state.relaxations(), 2);
    }

    #[test]
    fn relax_fails_when_nothing_can_loosen() {
        let mut state = DiversificationState::new(10, 1, 1, 3);
        state.record(keys(&["a"]));
        assert!(!state.relax());
        assert_eq!(state.relaxations(), 0);
    }

    #[test]
    fn relaxation_budget_is_shared_across_lineups() {
        let mut state = DiversificationState::new(4, 3, 2, 1);
        state.record(keys(&["a", "b", "c"]));
        assert!(state.relax());
        state.record(keys(&["a", "b", "d"]));
        // the second lineup's cut is fresh but the budget is already gone
        assert!(!state.relax());
        assert_eq!(state.cuts()[1].max_shared, 1);
    }

    #[test]
    fn captain_ceiling_saturates_repeat_captains() {
        let mut state = DiversificationState::new(10, 6, 2, 3).with_captain_target(4);
        assert_eq!(state.captain_ceiling(), Some(3));
        for _ in 0..2 {
            state.record_captain("kc-qb");
        }
        assert!(state.saturated_captains().is_empty());
        state.record_captain("kc-qb");
        state.record_captain("buf-qb");
        assert_eq!(state.saturated_captains(), keys(&["kc-qb"]));

        // fewer lineups than the target: every captain is used once
        let state = DiversificationState::new(3, 6, 2, 3).with_captain_target(4);
        assert_eq!(state.captain_ceiling(), Some(1));

        let mut state = DiversificationState::new(3, 6, 2, 3).with_captain_target(0);
        state.record_captain("kc-qb");
        state.record_captain("kc-qb");
        assert_eq!(state.captain_ceiling(), None);
        assert!(state.saturated_captains().is_empty());
    }

    #[test]
    fn floor_pins_player_when_remaining_equals_deficit() {
        let mut state = DiversificationState::new(3, 2, 1, 3)
            .with_exposure(BTreeMap::new(), BTreeMap::from([("x".to_string(), 2)]));
        assert!(state.pinned().is_empty());
        state.record(keys(&["a", "b"]));
        assert_eq!(state.pinned(), vec!["x"]);
        state.record(keys(&["x", "b"]));
        assert_eq!(state.pinned(), vec!["x"]);
        state.record(keys(&["x", "c"]));
        assert!(state.pinned().is_empty());
    }
}
