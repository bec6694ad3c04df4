use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aggregation::growth::{GrowthAnomaly, GrowthRates, HistoricalGrowth};
use crate::config::ScenarioMultipliers;

/// The three named growth assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioKind {
    Conservative,
    Moderate,
    Optimistic,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Conservative,
        ScenarioKind::Moderate,
        ScenarioKind::Optimistic,
    ];

    pub fn multiplier(&self, multipliers: &ScenarioMultipliers) -> Decimal {
        match self {
            ScenarioKind::Conservative => multipliers.conservative,
            ScenarioKind::Moderate => multipliers.moderate,
            ScenarioKind::Optimistic => multipliers.optimistic,
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Conservative => f.write_str("Conservative"),
            ScenarioKind::Moderate => f.write_str("Moderate"),
            ScenarioKind::Optimistic => f.write_str("Optimistic"),
        }
    }
}

/// A named growth assumption: historical rates scaled by one multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastScenario {
    pub kind: ScenarioKind,
    pub multiplier: Decimal,
    pub growth_rates: GrowthRates,
    /// Inherited from the historical fit; non-empty means the rates are unreliable
    pub anomalies: Vec<GrowthAnomaly>,
}

impl ForecastScenario {
    pub fn name(&self) -> String {
        self.kind.to_string()
    }

    pub fn is_flagged(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

/// Build Conservative, Moderate and Optimistic from one historical fit.
/// Scenarios never get independently fitted rates.
pub fn build_scenarios(
    growth: &HistoricalGrowth,
    multipliers: &ScenarioMultipliers,
) -> [ForecastScenario; 3] {
    ScenarioKind::ALL.map(|kind| {
        let multiplier = kind.multiplier(multipliers);
        ForecastScenario {
            kind,
            multiplier,
            growth_rates: growth.rates.scaled(multiplier),
            anomalies: growth.anomalies.clone(),
        }
    })
}
