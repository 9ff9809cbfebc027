// Contest roster templates.

use serde::{Deserialize, Serialize};

use crate::position::{Position, SlotKind};

/// Salary and score multiplier applied to the captain slot.
pub const CAPTAIN_MULTIPLIER: f64 = 1.5;

/// Default salary cap used when a contest config does not supply one.
pub const DEFAULT_SALARY_CAP: u32 = 50_000;

/// A position requirement in a contest template: `count` slots of `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlot {
    pub kind: SlotKind,
    pub count: usize,
}

/// Static roster configuration for one contest type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterTemplate {
    pub name: String,
    pub salary_cap: u32,
    /// Single-game mode: one CPT slot at 1.5x plus FLEX slots open to all positions.
    pub captain_mode: bool,
    pub slots: Vec<RosterSlot>,
}

impl RosterTemplate {
    /// Classic template: QB, RB x2, WR x3, TE, FLEX, DST.
    pub fn classic() -> Self {
        Self {
            name: "classic".into(),
            salary_cap: DEFAULT_SALARY_CAP,
            captain_mode: false,
            slots: vec![
                RosterSlot { kind: SlotKind::Qb, count: 1 },
                RosterSlot { kind: SlotKind::Rb, count: 2 },
                RosterSlot { kind: SlotKind::Wr, count: 3 },
                RosterSlot { kind: SlotKind::Te, count: 1 },
                RosterSlot { kind: SlotKind::Flex, count: 1 },
                RosterSlot { kind: SlotKind::Dst, count: 1 },
            ],
        }
    }

    /// Single-game template: CPT x1, FLEX x5.
    pub fn showdown() -> Self {
        Self {
            name: "showdown".into(),
            salary_cap: DEFAULT_SALARY_CAP,
            captain_mode: true,
            slots: vec![
                RosterSlot { kind: SlotKind::Cpt, count: 1 },
                RosterSlot { kind: SlotKind::Flex, count: 5 },
            ],
        }
    }

    /// Build a template from a `slot -> count` mapping (e.g. from contest.toml).
    ///
    /// Slots are ordered deterministically by `SlotKind::sort_order()` and
    /// zero-count entries are dropped. Returns the first unrecognized slot
    /// name as the error.
    pub fn from_slot_counts<'a, I>(
        name: &str,
        salary_cap: u32,
        captain_mode: bool,
        counts: I,
    ) -> Result<Self, String>
    where
        I: IntoIterator<Item = (&'a String, &'a usize)>,
    {
        let mut slots = Vec::new();
        for (key, &count) in counts {
            let kind = SlotKind::from_str_slot(key).ok_or_else(|| key.clone())?;
            if count > 0 {
                slots.push(RosterSlot { kind, count });
            }
        }
        slots.sort_by_key(|s| s.kind.sort_order());
        Ok(Self {
            name: name.to_string(),
            salary_cap,
            captain_mode,
            slots,
        })
    }

    /// Total number of players in a complete lineup.
    pub fn roster_size(&self) -> usize {
        self.slots.iter().map(|s| s.count).sum()
    }

    /// Whether a player at `pos` is eligible for at least one slot.
    pub fn is_eligible(&self, pos: Position) -> bool {
        self.slots
            .iter()
            .any(|s| s.kind.accepts(pos, self.captain_mode))
    }

    /// The salary multiplier for a slot kind under this template.
    pub fn salary_multiplier(&self, kind: SlotKind) -> f64 {
        if self.captain_mode && kind == SlotKind::Cpt {
            CAPTAIN_MULTIPLIER
        } else {
            1.0
        }
    }

    /// Whether the template has a captain slot.
    pub fn has_captain(&self) -> bool {
        self.captain_mode && self.slots.iter().any(|s| s.kind == SlotKind::Cpt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn classic_has_nine_slots() {
        let t = RosterTemplate::classic();
        assert_eq!(t.roster_size(), 9);
        assert!(!t.has_captain());
        assert_eq!(t.salary_multiplier(SlotKind::Flex), 1.0);
    }

    #[test]
    fn showdown_captain_multiplier() {
        let t = RosterTemplate::showdown();
        assert_eq!(t.roster_size(), 6);
        assert!(t.has_captain());
        assert_eq!(t.salary_multiplier(SlotKind::Cpt), CAPTAIN_MULTIPLIER);
        assert_eq!(t.salary_multiplier(SlotKind::Flex), 1.0);
    }

    #[test]
    fn from_slot_counts_orders_and_drops_zero() {
        let mut counts = BTreeMap::new();
        counts.insert("DST".to_string(), 1);
        counts.insert("QB".to_string(), 1);
        counts.insert("FLEX".to_string(), 0);
        let t = RosterTemplate::from_slot_counts("mini", 30_000, false, &counts).unwrap();
        assert_eq!(t.slots.len(), 2);
        assert_eq!(t.slots[0].kind, SlotKind::Qb);
        assert_eq!(t.slots[1].kind, SlotKind::Dst);
    }

    #[test]
    fn from_slot_counts_rejects_unknown_slot() {
        let mut counts = BTreeMap::new();
        counts.insert("K".to_string(), 1);
        let err = RosterTemplate::from_slot_counts("bad", 50_000, false, &counts).unwrap_err();
        assert_eq!(err, "K");
    }

    #[test]
    fn classic_eligibility() {
        let t = RosterTemplate::classic();
        for pos in Position::ALL {
            assert!(t.is_eligible(pos));
        }
    }
}
