// Shared domain types for the smartlineup workspace: positions, roster
// templates, factor bundles, weight profiles, scores, lineups, config and
// SQLite persistence.

pub mod config;
pub mod db;
pub mod factor;
pub mod lineup;
pub mod position;
pub mod profile;
pub mod roster;
pub mod score;

pub use factor::{Availability, Factor, PlayerFactor};
pub use lineup::{CaptainAssignment, Lineup, LineupSet, LineupSlot, Shortfall, ShortfallReason, Warning};
pub use position::{Position, SlotKind};
pub use profile::{ProfileConfig, ProfileSaveRequest, WeightProfile, WeightProfileStore, Weights};
pub use roster::{RosterSlot, RosterTemplate};
pub use score::PlayerScore;
