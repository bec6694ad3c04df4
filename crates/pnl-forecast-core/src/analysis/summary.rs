use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PnlError;
use crate::records::metrics::MonthlyRecord;
use crate::types::{margin_pct, LineItem, LineItems, Money};
use crate::PnlResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub record_count: usize,
    pub first_period: NaiveDate,
    pub last_period: NaiveDate,
    pub total_revenue: Money,
    pub total_net_profit: Money,
    /// Σ discounted net profit at the run's discount rate
    pub total_present_value: Money,
    /// Mean over periods with a defined margin; `None` if there are none
    pub average_margin_pct: Option<Decimal>,
}

/// One cost line's weight in the P&L.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostShare {
    pub line_item: LineItem,
    pub total: Money,
    pub share_of_revenue_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostStructure {
    pub lines: Vec<CostShare>,
    pub total_costs: Money,
    pub net_profit: Money,
    pub net_margin_pct: Option<Decimal>,
}

/// A single month singled out by a highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodValue {
    pub period_label: String,
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlights {
    pub best_revenue: PeriodValue,
    pub worst_revenue: PeriodValue,
    pub best_net_profit: PeriodValue,
    pub worst_net_profit: PeriodValue,
}

/// First-to-last growth over the loaded history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthSummary {
    /// (last - first) / first * 100; `None` when first is zero
    pub revenue_growth_pct: Option<Decimal>,
    pub net_profit_growth_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub mean: Decimal,
    pub median: Decimal,
    /// Sample standard deviation (n - 1); `None` with fewer than two values
    pub std_dev: Option<Decimal>,
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub key_metrics: KeyMetrics,
    pub cost_structure: CostStructure,
    pub highlights: Highlights,
    pub growth: GrowthSummary,
    pub revenue_statistics: SeriesStatistics,
    pub net_profit_statistics: SeriesStatistics,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Descriptive analytics over the derived monthly records.
pub fn summarize(records: &[MonthlyRecord]) -> PnlResult<FinancialSummary> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return Err(PnlError::InsufficientData(
                "Summary requires at least one record".into(),
            ))
        }
    };

    let mut totals = LineItems::default();
    for r in records {
        totals.accumulate(&r.amounts);
    }
    let total_net_profit: Money = records.iter().map(|r| r.net_profit_after_tax).sum();

    let margins: Vec<Decimal> = records.iter().filter_map(|r| r.profit_margin_pct).collect();
    let average_margin_pct = mean(&margins);

    let key_metrics = KeyMetrics {
        record_count: records.len(),
        first_period: first.period_date,
        last_period: last.period_date,
        total_revenue: totals.revenue,
        total_net_profit,
        total_present_value: records.iter().map(|r| r.discounted_net_profit).sum(),
        average_margin_pct,
    };

    let cost_structure = CostStructure {
        lines: LineItem::COSTS
            .iter()
            .map(|&item| CostShare {
                line_item: item,
                total: totals.get(item),
                share_of_revenue_pct: margin_pct(totals.get(item), totals.revenue),
            })
            .collect(),
        total_costs: totals.total_costs(),
        net_profit: total_net_profit,
        net_margin_pct: margin_pct(total_net_profit, totals.revenue),
    };

    let highlights = Highlights {
        best_revenue: pick(records, |r| r.amounts.revenue, true),
        worst_revenue: pick(records, |r| r.amounts.revenue, false),
        best_net_profit: pick(records, |r| r.net_profit_after_tax, true),
        worst_net_profit: pick(records, |r| r.net_profit_after_tax, false),
    };

    let growth = GrowthSummary {
        revenue_growth_pct: margin_pct(
            last.amounts.revenue - first.amounts.revenue,
            first.amounts.revenue,
        ),
        net_profit_growth_pct: margin_pct(
            last.net_profit_after_tax - first.net_profit_after_tax,
            first.net_profit_after_tax,
        ),
    };

    let revenues: Vec<Decimal> = records.iter().map(|r| r.amounts.revenue).collect();
    let profits: Vec<Decimal> = records.iter().map(|r| r.net_profit_after_tax).collect();

    Ok(FinancialSummary {
        key_metrics,
        cost_structure,
        highlights,
        growth,
        revenue_statistics: statistics(&revenues)?,
        net_profit_statistics: statistics(&profits)?,
    })
}

/// Mean, median, sample standard deviation, min and max.
pub fn statistics(values: &[Decimal]) -> PnlResult<SeriesStatistics> {
    let mean_value = mean(values).ok_or_else(|| {
        PnlError::InsufficientData("Statistics require at least one value".into())
    })?;

    let mut sorted = values.to_vec();
    sorted.sort();
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / dec!(2)
    };

    let std_dev = if n < 2 {
        None
    } else {
        let sum_sq: Decimal = values.iter().map(|v| (*v - mean_value) * (*v - mean_value)).sum();
        (sum_sq / Decimal::from((n - 1) as u64)).sqrt()
    };

    Ok(SeriesStatistics {
        mean: mean_value,
        median,
        std_dev,
        min: sorted[0],
        max: sorted[n - 1],
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().copied().sum();
    Some(total / Decimal::from(values.len() as u64))
}

/// First record holding the max (or min) value, matching report order.
fn pick<F>(records: &[MonthlyRecord], key: F, highest: bool) -> PeriodValue
where
    F: Fn(&MonthlyRecord) -> Decimal,
{
    let mut best = &records[0];
    for r in &records[1..] {
        let better = if highest {
            key(r) > key(best)
        } else {
            key(r) < key(best)
        };
        if better {
            best = r;
        }
    }
    PeriodValue {
        period_label: best.period_label.clone(),
        value: key(best),
    }
}
