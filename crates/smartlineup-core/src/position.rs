// Football positions and the roster slot kinds they can fill.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Player positions on a DFS football slate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "DST")]
    Defense,
}

impl Position {
    /// Parse a position string into a Position enum.
    ///
    /// Accepts the common site spellings for defenses ("DST", "D/ST", "DEF", "D").
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "DST" | "D/ST" | "DEF" | "D" => Some(Position::Defense),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Defense => "DST",
        }
    }

    /// Whether this position catches passes for stacking purposes.
    pub fn is_pass_catcher(&self) -> bool {
        matches!(self, Position::WideReceiver | Position::TightEnd)
    }

    /// Whether this position is eligible for a classic FLEX slot.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(
            self,
            Position::RunningBack | Position::WideReceiver | Position::TightEnd
        )
    }

    pub const ALL: [Position; 5] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::Defense,
    ];
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Slot kinds
// ---------------------------------------------------------------------------

/// A roster slot designation in a contest template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlotKind {
    Qb,
    Rb,
    Wr,
    Te,
    Flex,
    Dst,
    /// Single-game captain slot (1.5x salary and points).
    Cpt,
}

impl SlotKind {
    pub fn from_str_slot(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(SlotKind::Qb),
            "RB" => Some(SlotKind::Rb),
            "WR" => Some(SlotKind::Wr),
            "TE" => Some(SlotKind::Te),
            "FLEX" | "UTIL" => Some(SlotKind::Flex),
            "DST" | "D/ST" | "DEF" => Some(SlotKind::Dst),
            "CPT" | "CAPTAIN" => Some(SlotKind::Cpt),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            SlotKind::Qb => "QB",
            SlotKind::Rb => "RB",
            SlotKind::Wr => "WR",
            SlotKind::Te => "TE",
            SlotKind::Flex => "FLEX",
            SlotKind::Dst => "DST",
            SlotKind::Cpt => "CPT",
        }
    }

    /// Whether a player at `pos` may fill this slot.
    ///
    /// In captain mode every position is eligible for both CPT and FLEX.
    pub fn accepts(&self, pos: Position, captain_mode: bool) -> bool {
        if captain_mode {
            return matches!(self, SlotKind::Cpt | SlotKind::Flex);
        }
        match self {
            SlotKind::Qb => pos == Position::Quarterback,
            SlotKind::Rb => pos == Position::RunningBack,
            SlotKind::Wr => pos == Position::WideReceiver,
            SlotKind::Te => pos == Position::TightEnd,
            SlotKind::Dst => pos == Position::Defense,
            SlotKind::Flex => pos.is_flex_eligible(),
            SlotKind::Cpt => false,
        }
    }

    /// Deterministic ordering index for lineup display.
    pub fn sort_order(&self) -> u8 {
        match self {
            SlotKind::Cpt => 0,
            SlotKind::Qb => 1,
            SlotKind::Rb => 2,
            SlotKind::Wr => 3,
            SlotKind::Te => 4,
            SlotKind::Flex => 5,
            SlotKind::Dst => 6,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defense_spellings() {
        for s in ["DST", "d/st", "DEF", "D"] {
            assert_eq!(Position::from_str_pos(s), Some(Position::Defense), "{s}");
        }
        assert_eq!(Position::from_str_pos("K"), None);
    }

    #[test]
    fn classic_flex_excludes_qb_and_dst() {
        assert!(SlotKind::Flex.accepts(Position::RunningBack, false));
        assert!(SlotKind::Flex.accepts(Position::TightEnd, false));
        assert!(!SlotKind::Flex.accepts(Position::Quarterback, false));
        assert!(!SlotKind::Flex.accepts(Position::Defense, false));
    }

    #[test]
    fn captain_mode_accepts_every_position() {
        for pos in Position::ALL {
            assert!(SlotKind::Cpt.accepts(pos, true));
            assert!(SlotKind::Flex.accepts(pos, true));
            assert!(!SlotKind::Qb.accepts(pos, true));
        }
    }

    #[test]
    fn cpt_never_accepted_in_classic() {
        assert!(!SlotKind::Cpt.accepts(Position::Quarterback, false));
    }

    #[test]
    fn slot_round_trips_through_display() {
        for slot in [SlotKind::Qb, SlotKind::Flex, SlotKind::Dst, SlotKind::Cpt] {
            assert_eq!(SlotKind::from_str_slot(slot.display_str()), Some(slot));
        }
    }
}
