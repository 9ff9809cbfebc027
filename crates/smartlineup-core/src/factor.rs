// The eight scoring factors and the per-player-per-week input bundle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::position::Position;

/// One of the eight named scoring inputs, W1..W8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Factor {
    #[serde(rename = "W1")]
    Projection,
    #[serde(rename = "W2")]
    CeilingFloor,
    #[serde(rename = "W3")]
    Ownership,
    #[serde(rename = "W4")]
    SalaryValue,
    #[serde(rename = "W5")]
    Trend,
    #[serde(rename = "W6")]
    Regression,
    #[serde(rename = "W7")]
    Vegas,
    #[serde(rename = "W8")]
    Matchup,
}

impl Factor {
    /// All factors in weight-vector order.
    pub const ALL: [Factor; 8] = [
        Factor::Projection,
        Factor::CeilingFloor,
        Factor::Ownership,
        Factor::SalaryValue,
        Factor::Trend,
        Factor::Regression,
        Factor::Vegas,
        Factor::Matchup,
    ];

    /// Zero-based position in the weight vector.
    pub fn index(&self) -> usize {
        match self {
            Factor::Projection => 0,
            Factor::CeilingFloor => 1,
            Factor::Ownership => 2,
            Factor::SalaryValue => 3,
            Factor::Trend => 4,
            Factor::Regression => 5,
            Factor::Vegas => 6,
            Factor::Matchup => 7,
        }
    }

    /// Weight identifier ("W1".."W8").
    pub fn code(&self) -> &'static str {
        match self {
            Factor::Projection => "W1",
            Factor::CeilingFloor => "W2",
            Factor::Ownership => "W3",
            Factor::SalaryValue => "W4",
            Factor::Trend => "W5",
            Factor::Regression => "W6",
            Factor::Vegas => "W7",
            Factor::Matchup => "W8",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Factor::Projection => "projection",
            Factor::CeilingFloor => "ceiling/floor",
            Factor::Ownership => "ownership penalty",
            Factor::SalaryValue => "salary value",
            Factor::Trend => "usage trend",
            Factor::Regression => "regression penalty",
            Factor::Vegas => "vegas context",
            Factor::Matchup => "matchup",
        }
    }

    /// Fixed polarity: ownership and regression risk are penalties.
    pub fn sign(&self) -> f64 {
        match self {
            Factor::Ownership | Factor::Regression => -1.0,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Injury / availability designation supplied by the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Active,
    Questionable,
    Doubtful,
    Out,
}

impl Availability {
    pub fn from_str_status(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "Q" | "QUESTIONABLE" => Availability::Questionable,
            "D" | "DOUBTFUL" => Availability::Doubtful,
            "O" | "OUT" | "IR" | "PUP" | "SUSPENDED" => Availability::Out,
            _ => Availability::Active,
        }
    }

    pub fn is_out(&self) -> bool {
        *self == Availability::Out
    }
}

/// Resolved per-player-per-week inputs to the score engine.
///
/// Every numeric field is already defaulted where the upstream source was
/// absent; `missing_flags` records which factors were defaulted. `salary`
/// stays optional because an unpriced player can be scored but not rostered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFactor {
    pub player_key: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub opponent: Option<String>,
    pub availability: Availability,
    pub week: u32,
    pub projection: f64,
    pub ceiling: f64,
    pub floor: f64,
    pub ownership_pct: f64,
    pub salary: Option<u32>,
    pub trend_adjustment: f64,
    pub regression_flag: bool,
    pub vegas_itt_ratio: f64,
    pub matchup_adjustment: f64,
    pub missing_flags: BTreeSet<Factor>,
}

impl PlayerFactor {
    pub fn is_missing(&self, factor: Factor) -> bool {
        self.missing_flags.contains(&factor)
    }

    /// Whether any factor was computed from a default.
    pub fn has_defaults(&self) -> bool {
        !self.missing_flags.is_empty()
    }
}
