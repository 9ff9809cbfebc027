// Weight profiles: the eight factor weights plus scoring options.

use serde::{Deserialize, Serialize};

use crate::factor::Factor;
use crate::position::Position;

/// Default most-recent-game threshold for the regression flag.
pub const DEFAULT_REGRESSION_THRESHOLD: f64 = 20.0;

/// Factor weight multipliers. The field names use the weight codes (W1..W8)
/// so they match the TOML keys directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct Weights {
    pub W1: f64,
    pub W2: f64,
    pub W3: f64,
    pub W4: f64,
    pub W5: f64,
    pub W6: f64,
    pub W7: f64,
    pub W8: f64,
}

impl Weights {
    pub fn from_array(w: [f64; 8]) -> Self {
        Self {
            W1: w[0],
            W2: w[1],
            W3: w[2],
            W4: w[3],
            W5: w[4],
            W6: w[5],
            W7: w[6],
            W8: w[7],
        }
    }

    pub fn as_array(&self) -> [f64; 8] {
        [
            self.W1, self.W2, self.W3, self.W4, self.W5, self.W6, self.W7, self.W8,
        ]
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.as_array()[factor.index()]
    }

    /// Return a copy with one weight replaced.
    pub fn with(&self, factor: Factor, value: f64) -> Self {
        let mut w = self.as_array();
        w[factor.index()] = value;
        Self::from_array(w)
    }

    /// Weight vector that ranks by projection alone.
    pub fn projection_only() -> Self {
        Self::from_array([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
    }

    /// Multiply every weight by `k`.
    pub fn scaled(&self, k: f64) -> Self {
        Self::from_array(self.as_array().map(|w| w * k))
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::from_array([0.30, 0.10, 0.10, 0.15, 0.10, 0.05, 0.10, 0.10])
    }
}

/// Scoring options carried alongside the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Preferred projection source; the consensus of all sources is used when
    /// this one is missing for a player.
    #[serde(default)]
    pub projection_source: Option<String>,
    /// Apply the W6 regression penalty to flagged players.
    #[serde(default = "default_true")]
    pub eighty_twenty_enabled: bool,
    /// Most-recent-game fantasy points above which a player is flagged.
    #[serde(default = "default_regression_threshold")]
    pub regression_threshold: f64,
    /// Positions the regression penalty applies to.
    #[serde(default = "default_regression_positions")]
    pub regression_positions: Vec<Position>,
}

fn default_true() -> bool {
    true
}

fn default_regression_threshold() -> f64 {
    DEFAULT_REGRESSION_THRESHOLD
}

fn default_regression_positions() -> Vec<Position> {
    Position::ALL.to_vec()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            projection_source: None,
            eighty_twenty_enabled: true,
            regression_threshold: DEFAULT_REGRESSION_THRESHOLD,
            regression_positions: default_regression_positions(),
        }
    }
}

/// A named weight vector plus config. Treated as a read-only snapshot for the
/// duration of a scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub name: String,
    pub weights: Weights,
    #[serde(default)]
    pub config: ProfileConfig,
}

impl WeightProfile {
    pub fn new(name: impl Into<String>, weights: Weights) -> Self {
        Self {
            name: name.into(),
            weights,
            config: ProfileConfig::default(),
        }
    }

    /// Build a request asking the profile store to persist this profile
    /// under a new name.
    pub fn save_as(&self, name: impl Into<String>) -> ProfileSaveRequest {
        ProfileSaveRequest {
            name: name.into(),
            weights: self.weights,
            config: self.config.clone(),
        }
    }
}

impl Default for WeightProfile {
    fn default() -> Self {
        Self::new("default", Weights::default())
    }
}

/// "Persist this profile" message sent to the profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSaveRequest {
    pub name: String,
    pub weights: Weights,
    pub config: ProfileConfig,
}

impl ProfileSaveRequest {
    pub fn into_profile(self) -> WeightProfile {
        WeightProfile {
            name: self.name,
            weights: self.weights,
            config: self.config,
        }
    }
}

/// Storage collaborator for weight profiles. The scoring core never touches
/// storage itself; callers pass profiles in and hand save requests out.
pub trait WeightProfileStore {
    fn save_profile(&self, request: &ProfileSaveRequest) -> anyhow::Result<()>;
    fn load_profile(&self, name: &str) -> anyhow::Result<Option<WeightProfile>>;
    fn list_profiles(&self) -> anyhow::Result<Vec<String>>;
}
