use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregation::growth::{historical_growth, GrowthAnomaly, GrowthRates, HistoricalGrowth};
use crate::aggregation::quarterly::{quarter_label, quarter_of};
use crate::config::ScenarioMultipliers;
use crate::error::PnlError;
use crate::forecast::scenario::{build_scenarios, ForecastScenario, ScenarioKind};
use crate::types::{Frequency, LineItem, LineItems, Money};
use crate::PnlResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One projected future period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 1-based steps after the last historical period
    pub step: u32,
    pub period_date: NaiveDate,
    /// "Mon-YYYY" for monthly, "Q{q}-{year}" for quarterly
    pub period_label: String,
    #[serde(flatten)]
    pub amounts: LineItems,
    pub net_profit: Money,
    pub profit_margin_pct: Option<Decimal>,
}

/// Totals across the whole horizon of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub total_revenue: Money,
    pub total_net_profit: Money,
    pub average_revenue: Money,
    pub average_net_profit: Money,
    pub final_revenue: Money,
    pub final_net_profit: Money,
}

/// A projected path for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioForecast {
    pub scenario: ScenarioKind,
    pub multiplier: Decimal,
    pub growth_rates: GrowthRates,
    pub points: Vec<ForecastPoint>,
    pub summary: ScenarioSummary,
    /// True when any growth rate behind this path came from an anomalous base
    /// or the path was cut short
    pub flagged: bool,
    pub anomalies: Vec<GrowthAnomaly>,
    /// First step that could not be represented; `points` stops just before it
    pub truncated_at: Option<u32>,
}

impl ScenarioForecast {
    pub fn is_truncated(&self) -> bool {
        self.truncated_at.is_some()
    }
}

/// All three scenarios for one frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastSet {
    pub frequency: Frequency,
    pub horizon: u32,
    pub baseline_date: NaiveDate,
    pub baseline: LineItems,
    pub historical_growth: HistoricalGrowth,
    pub scenarios: Vec<ScenarioForecast>,
}

impl ForecastSet {
    pub fn scenario(&self, kind: ScenarioKind) -> Option<&ScenarioForecast> {
        self.scenarios.iter().find(|s| s.scenario == kind)
    }

    pub fn is_flagged(&self) -> bool {
        self.historical_growth.is_anomalous() || self.scenarios.iter().any(|s| s.flagged)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compound each line item forward independently for `horizon` periods:
/// `value_k = value_{k-1} * (1 + g)`.
///
/// A path that leaves `Decimal` range stops at the last representable step
/// and comes back flagged with `truncated_at` set; it is never an error.
pub fn project(
    baseline: &LineItems,
    baseline_date: NaiveDate,
    scenario: &ForecastScenario,
    frequency: Frequency,
    horizon: u32,
) -> PnlResult<ScenarioForecast> {
    if horizon == 0 {
        return Err(PnlError::InvalidInput {
            field: "horizon".into(),
            reason: "Forecast horizon must be at least one period".into(),
        });
    }

    let rates = &scenario.growth_rates;
    let mut current = *baseline;
    let mut points = Vec::with_capacity(horizon as usize);
    let mut totals = Totals::default();
    let mut truncated_at = None;

    for step in 1..=horizon {
        let Some((next, net_profit)) = compound(&current, rates) else {
            truncated_at = Some(step);
            break;
        };
        let Some(running) = totals.add(next.revenue, net_profit) else {
            truncated_at = Some(step);
            break;
        };

        let period_date = step_date(baseline_date, frequency, step)?;
        points.push(ForecastPoint {
            step,
            period_date,
            period_label: period_label(period_date, frequency),
            amounts: next,
            net_profit,
            profit_margin_pct: next.profit_margin_pct(),
        });
        totals = running;
        current = next;
    }

    if let Some(step) = truncated_at {
        warn!(scenario = %scenario.kind, %frequency, step, "projection out of range, truncated");
    } else if scenario.is_flagged() {
        warn!(scenario = %scenario.kind, %frequency, "projection built on anomalous growth");
    }

    Ok(ScenarioForecast {
        scenario: scenario.kind,
        multiplier: scenario.multiplier,
        growth_rates: scenario.growth_rates,
        summary: totals.summary(&points),
        points,
        flagged: scenario.is_flagged() || truncated_at.is_some(),
        anomalies: scenario.anomalies.clone(),
        truncated_at,
    })
}

/// Fit growth over `series`, build the three scenarios and project each one
/// from the last period in the series.
pub fn forecast_scenarios(
    series: &[LineItems],
    baseline_date: NaiveDate,
    frequency: Frequency,
    horizon: u32,
    multipliers: &ScenarioMultipliers,
) -> PnlResult<ForecastSet> {
    let growth = historical_growth(series)?;
    let baseline = *series.last().ok_or_else(|| {
        PnlError::InsufficientData("Forecast requires at least one historical period".into())
    })?;

    let scenarios = build_scenarios(&growth, multipliers)
        .iter()
        .map(|s| project(&baseline, baseline_date, s, frequency, horizon))
        .collect::<PnlResult<Vec<_>>>()?;

    debug!(%frequency, horizon, periods = growth.periods, "scenarios projected");
    Ok(ForecastSet {
        frequency,
        horizon,
        baseline_date,
        baseline,
        historical_growth: growth,
        scenarios,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn step_date(base: NaiveDate, frequency: Frequency, step: u32) -> PnlResult<NaiveDate> {
    let months = step * frequency.months_per_period();
    base.checked_add_months(Months::new(months))
        .ok_or_else(|| PnlError::DateError(format!("{base} + {months} months is out of range")))
}

fn period_label(date: NaiveDate, frequency: Frequency) -> String {
    match frequency {
        Frequency::Monthly => date.format("%b-%Y").to_string(),
        Frequency::Quarterly => quarter_label(date.year(), quarter_of(date)),
    }
}

/// One step of compounding plus its net profit, `None` when out of range.
fn compound(current: &LineItems, rates: &GrowthRates) -> Option<(LineItems, Money)> {
    let mut next = LineItems::default();
    for item in LineItem::ALL {
        let factor = Decimal::ONE.checked_add(rates.get(item))?;
        *next.get_mut(item) = current.get(item).checked_mul(factor)?;
    }
    let net_profit = next.checked_net_profit()?;
    Some((next, net_profit))
}

/// Running horizon totals, kept checked so the summary can never overflow.
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    revenue: Money,
    net_profit: Money,
}

impl Totals {
    fn add(&self, revenue: Money, net_profit: Money) -> Option<Totals> {
        Some(Totals {
            revenue: self.revenue.checked_add(revenue)?,
            net_profit: self.net_profit.checked_add(net_profit)?,
        })
    }

    fn summary(&self, points: &[ForecastPoint]) -> ScenarioSummary {
        let n = Decimal::from(points.len() as u64);
        let (average_revenue, average_net_profit) = if n.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            (self.revenue / n, self.net_profit / n)
        };
        let last = points.last();
        ScenarioSummary {
            total_revenue: self.revenue,
            total_net_profit: self.net_profit,
            average_revenue,
            average_net_profit,
            final_revenue: last.map(|p| p.amounts.revenue).unwrap_or_default(),
            final_net_profit: last.map(|p| p.net_profit).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn revenue_only(v: Decimal) -> LineItems {
        LineItems {
            revenue: v,
            ..LineItems::default()
        }
    }

    fn scenario(rate: Decimal) -> ForecastScenario {
        ForecastScenario {
            kind: ScenarioKind::Moderate,
            multiplier: dec!(1),
            growth_rates: GrowthRates {
                revenue: rate,
                operating_expense: rate,
                ..GrowthRates::default()
            },
            anomalies: vec![],
        }
    }

    fn mar_2023() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()
    }

    #[test]
    fn test_compounds_each_item() {
        let base = LineItems {
            revenue: dec!(100),
            operating_expense: dec!(40),
            tax: dec!(10),
            ..LineItems::default()
        };
        let f = project(&base, mar_2023(), &scenario(dec!(0.10)), Frequency::Monthly, 2).unwrap();
        assert_eq!(f.points[0].amounts.revenue, dec!(110.0));
        assert_eq!(f.points[1].amounts.revenue, dec!(121.00));
        assert_eq!(f.points[1].amounts.operating_expense, dec!(48.40));
        // tax has zero growth
        assert_eq!(f.points[1].amounts.tax, dec!(10));
        assert_eq!(f.points[1].net_profit, dec!(62.60));
    }

    #[test]
    fn test_monthly_labels_and_dates() {
        let f = project(&revenue_only(dec!(1)), mar_2023(), &scenario(dec!(0)), Frequency::Monthly, 10)
            .unwrap();
        assert_eq!(f.points[0].period_label, "Apr-2023");
        assert_eq!(f.points[9].period_label, "Jan-2024");
        assert_eq!(f.points.len(), 10);
    }

    #[test]
    fn test_quarterly_labels() {
        let f = project(&revenue_only(dec!(1)), mar_2023(), &scenario(dec!(0)), Frequency::Quarterly, 4)
            .unwrap();
        let labels: Vec<&str> = f.points.iter().map(|p| p.period_label.as_str()).collect();
        assert_eq!(labels, vec!["Q2-2023", "Q3-2023", "Q4-2023", "Q1-2024"]);
    }

    #[test]
    fn test_zero_revenue_margin_is_undefined() {
        let f = project(&LineItems::default(), mar_2023(), &scenario(dec!(0.1)), Frequency::Monthly, 3)
            .unwrap();
        assert!(f.points.iter().all(|p| p.profit_margin_pct.is_none()));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        assert!(project(&revenue_only(dec!(1)), mar_2023(), &scenario(dec!(0)), Frequency::Monthly, 0)
            .is_err());
    }

    #[test]
    fn test_summary_totals() {
        let f = project(&revenue_only(dec!(100)), mar_2023(), &scenario(dec!(0)), Frequency::Monthly, 4)
            .unwrap();
        assert_eq!(f.summary.total_revenue, dec!(400));
        assert_eq!(f.summary.average_revenue, dec!(100));
        assert_eq!(f.summary.final_net_profit, dec!(100));
    }

    #[test]
    fn test_forecast_scenarios_orders_three_paths() {
        let series = vec![revenue_only(dec!(100)), revenue_only(dec!(110)), revenue_only(dec!(121))];
        let set = forecast_scenarios(
            &series,
            mar_2023(),
            Frequency::Monthly,
            1,
            &ScenarioMultipliers::default(),
        )
        .unwrap();
        assert_eq!(set.scenarios.len(), 3);
        let c = set.scenario(ScenarioKind::Conservative).unwrap();
        let m = set.scenario(ScenarioKind::Moderate).unwrap();
        let o = set.scenario(ScenarioKind::Optimistic).unwrap();
        assert!(c.points[0].amounts.revenue < m.points[0].amounts.revenue);
        assert!(m.points[0].amounts.revenue < o.points[0].amounts.revenue);
        // 121 * (1.21)^(1/3) ≈ 128.94
        assert!((m.points[0].amounts.revenue - dec!(128.9378)).abs() < dec!(0.01));
    }

    #[test]
    fn test_overflowing_path_is_truncated_and_flagged() {
        let base = LineItems {
            revenue: dec!(1000),
            sga_expense: dec!(500),
            ..LineItems::default()
        };
        let rates = ForecastScenario {
            growth_rates: GrowthRates {
                sga_expense: dec!(9),
                ..GrowthRates::default()
            },
            ..scenario(dec!(0))
        };
        // 500 * 10^k passes 7.9e28 at k = 27
        let f = project(&base, mar_2023(), &rates, Frequency::Monthly, 60).unwrap();
        assert_eq!(f.truncated_at, Some(27));
        assert_eq!(f.points.len(), 26);
        assert!(f.flagged);
        assert_eq!(f.summary.final_revenue, dec!(1000));
        assert_eq!(f.summary.total_revenue, dec!(26000));
    }
}
