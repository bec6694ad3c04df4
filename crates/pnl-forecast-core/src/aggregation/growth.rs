use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PnlError;
use crate::types::{LineItem, LineItems, Money, Rate};
use crate::PnlResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One compound growth rate per line item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthRates {
    pub revenue: Rate,
    pub operating_expense: Rate,
    pub tax: Rate,
    pub finance_cost: Rate,
    pub sga_expense: Rate,
}

impl GrowthRates {
    pub fn get(&self, item: LineItem) -> Rate {
        match item {
            LineItem::Revenue => self.revenue,
            LineItem::OperatingExpense => self.operating_expense,
            LineItem::Tax => self.tax,
            LineItem::FinanceCost => self.finance_cost,
            LineItem::SgaExpense => self.sga_expense,
        }
    }

    fn set(&mut self, item: LineItem, rate: Rate) {
        match item {
            LineItem::Revenue => self.revenue = rate,
            LineItem::OperatingExpense => self.operating_expense = rate,
            LineItem::Tax => self.tax = rate,
            LineItem::FinanceCost => self.finance_cost = rate,
            LineItem::SgaExpense => self.sga_expense = rate,
        }
    }

    /// Every rate multiplied by `multiplier`.
    pub fn scaled(&self, multiplier: Decimal) -> GrowthRates {
        let mut out = GrowthRates::default();
        for item in LineItem::ALL {
            out.set(item, self.get(item) * multiplier);
        }
        out
    }
}

/// A line item whose historical growth could not be derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthAnomaly {
    pub line_item: LineItem,
    pub first_value: Money,
    pub last_value: Money,
    pub reason: String,
}

/// Growth derived from a historical series of aggregated periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalGrowth {
    /// n, the number of aggregated periods the rates were fitted over
    pub periods: usize,
    /// Anomalous line items carry a rate of zero here
    pub rates: GrowthRates,
    pub anomalies: Vec<GrowthAnomaly>,
}

impl HistoricalGrowth {
    pub fn is_anomalous(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compound per-period growth `g = (last / first)^(1/n) - 1`.
///
/// A non-positive `first` or a negative `last` has no real root and is
/// reported as [`PnlError::AnomalousGrowthBase`]. A zero `last` gives -100%.
pub fn compound_growth_rate(first: Money, last: Money, periods: usize) -> PnlResult<Rate> {
    if periods == 0 {
        return Err(PnlError::InsufficientData(
            "Growth rate requires at least one period".into(),
        ));
    }
    if first <= Decimal::ZERO || last < Decimal::ZERO {
        return Err(PnlError::AnomalousGrowthBase {
            line_item: String::new(),
            first_value: first,
            last_value: last,
        });
    }
    if last.is_zero() {
        return Ok(-Decimal::ONE);
    }

    let ratio = last / first;
    if ratio == Decimal::ONE {
        return Ok(Decimal::ZERO);
    }
    let exponent = Decimal::ONE / Decimal::from(periods as u64);
    let root = ratio
        .checked_powd(exponent)
        .ok_or_else(|| PnlError::InvalidInput {
            field: "growth".into(),
            reason: format!("({ratio})^(1/{periods}) is not representable"),
        })?;
    Ok(root - Decimal::ONE)
}

/// Fit one compound growth rate per line item over `series`, first to last.
///
/// Line items with an anomalous base are held flat (rate zero) and listed in
/// `anomalies` so the caller can flag any projection built on them.
pub fn historical_growth(series: &[LineItems]) -> PnlResult<HistoricalGrowth> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return Err(PnlError::InsufficientData(
                "Growth derivation requires at least one period".into(),
            ))
        }
    };
    let periods = series.len();

    let mut rates = GrowthRates::default();
    let mut anomalies = Vec::new();

    for item in LineItem::ALL {
        let (f, l) = (first.get(item), last.get(item));
        // A line that is zero at both ends projects to zero under any rate.
        if f.is_zero() && l.is_zero() {
            continue;
        }
        match compound_growth_rate(f, l, periods) {
            Ok(rate) => rates.set(item, rate),
            Err(PnlError::AnomalousGrowthBase { .. }) => {
                let reason = if f <= Decimal::ZERO {
                    format!("first value {f} is not positive")
                } else {
                    format!("last value {l} is negative")
                };
                warn!(line_item = %item, %f, %l, "anomalous growth base");
                anomalies.push(GrowthAnomaly {
                    line_item: item,
                    first_value: f,
                    last_value: l,
                    reason,
                });
            }
            Err(e) => return Err(e),
        }
    }

    debug!(periods, anomalies = anomalies.len(), "historical growth derived");
    Ok(HistoricalGrowth {
        periods,
        rates,
        anomalies,
    })
}
