use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PnlError;
use crate::types::Rate;
use crate::PnlResult;

const MAX_HORIZON: u32 = 1200;

/// Growth multipliers for the three scenarios that are always produced together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioMultipliers {
    pub conservative: Decimal,
    pub moderate: Decimal,
    pub optimistic: Decimal,
}

impl Default for ScenarioMultipliers {
    fn default() -> Self {
        Self {
            conservative: dec!(0.5),
            moderate: dec!(1.0),
            optimistic: dec!(1.5),
        }
    }
}

/// Everything a pipeline run depends on besides the rows themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Periodic discount rate applied per period index t
    pub discount_rate: Rate,
    /// Months projected by the monthly forecast
    pub monthly_horizon: u32,
    /// Quarters projected by the quarterly forecast
    pub quarterly_horizon: u32,
    pub scenarios: ScenarioMultipliers,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            discount_rate: dec!(0.06),
            monthly_horizon: 60,
            quarterly_horizon: 20,
            scenarios: ScenarioMultipliers::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> PnlResult<()> {
        if self.discount_rate <= dec!(-1) {
            return Err(PnlError::InvalidInput {
                field: "discount_rate".into(),
                reason: "Discount rate must be greater than -100%".into(),
            });
        }
        for (field, horizon) in [
            ("monthly_horizon", self.monthly_horizon),
            ("quarterly_horizon", self.quarterly_horizon),
        ] {
            if horizon == 0 || horizon > MAX_HORIZON {
                return Err(PnlError::InvalidInput {
                    field: field.into(),
                    reason: format!("must be between 1 and {MAX_HORIZON}, got {horizon}"),
                });
            }
        }
        let m = &self.scenarios;
        for (name, value) in [
            ("conservative", m.conservative),
            ("moderate", m.moderate),
            ("optimistic", m.optimistic),
        ] {
            if value < Decimal::ZERO {
                return Err(PnlError::InvalidInput {
                    field: format!("scenarios.{name}"),
                    reason: "multiplier must be non-negative".into(),
                });
            }
        }
        Ok(())
    }
}
