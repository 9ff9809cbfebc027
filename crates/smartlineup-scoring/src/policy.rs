// Fallback values used when a factor's upstream input is absent.

use smartlineup_core::Factor;

/// One row of the fallback table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorDefault {
    pub factor: Factor,
    /// Value substituted for the missing input. For W2 this is the spread
    /// applied to the projection (ceiling = p * (1 + v), floor = p * (1 - v)).
    pub value: f64,
    /// When the default applies.
    pub condition: &'static str,
}

/// Single table mapping each factor to its default and missing flag.
///
/// The flag recorded on a defaulted `PlayerFactor` is always the factor
/// itself, so the table only needs the value and the condition text.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorDefaultPolicy {
    entries: [FactorDefault; 8],
}

impl FactorDefaultPolicy {
    pub fn standard() -> Self {
        Self {
            entries: [
                FactorDefault {
                    factor: Factor::Projection,
                    value: 0.0,
                    condition: "no projection from any source",
                },
                FactorDefault {
                    factor: Factor::CeilingFloor,
                    value: 0.35,
                    condition: "ceiling or floor absent",
                },
                FactorDefault {
                    factor: Factor::Ownership,
                    value: 10.0,
                    condition: "ownership absent",
                },
                FactorDefault {
                    factor: Factor::SalaryValue,
                    value: 0.0,
                    condition: "salary absent",
                },
                FactorDefault {
                    factor: Factor::Trend,
                    value: 0.0,
                    condition: "fewer than the minimum number of game logs",
                },
                FactorDefault {
                    factor: Factor::Regression,
                    value: 0.0,
                    condition: "no game logs",
                },
                FactorDefault {
                    factor: Factor::Vegas,
                    value: 1.0,
                    condition: "no implied total for the team this week",
                },
                FactorDefault {
                    factor: Factor::Matchup,
                    value: 0.0,
                    condition: "no opponent defensive rank",
                },
            ],
        }
    }

    pub fn get(&self, factor: Factor) -> &FactorDefault {
        &self.entries[factor.index()]
    }

    pub fn value(&self, factor: Factor) -> f64 {
        self.get(factor).value
    }

    /// Replace one default value.
    pub fn with_value(mut self, factor: Factor, value: f64) -> Self {
        self.entries[factor.index()].value = value;
        self
    }

    pub fn entries(&self) -> &[FactorDefault] {
        &self.entries
    }
}

impl Default for FactorDefaultPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
