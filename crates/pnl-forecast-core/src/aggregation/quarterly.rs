use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::records::metrics::MonthlyRecord;
use crate::types::{LineItems, Money};

/// Sums for one calendar quarter present in the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterAggregate {
    /// "Q{1-4}-{year}"
    pub quarter_label: String,
    pub year: i32,
    pub quarter: u32,
    /// Number of monthly records that fell in this quarter
    pub month_count: u32,
    /// Last month of the quarter seen in the data
    pub last_period_date: NaiveDate,
    #[serde(flatten)]
    pub amounts: LineItems,
    pub net_profit_after_tax: Money,
    pub discounted_net_profit: Money,
    pub profit_margin_pct: Option<Decimal>,
}

/// `ceil(month / 3)`
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month().div_ceil(3)
}

pub fn quarter_label(year: i32, quarter: u32) -> String {
    format!("Q{quarter}-{year}")
}

/// Group records by `(year, quarter)` and sum them, in chronological order.
///
/// Pure: the same records always give the same aggregates, and nothing here
/// holds on to the input.
pub fn aggregate_quarters(records: &[MonthlyRecord]) -> Vec<QuarterAggregate> {
    let mut groups: BTreeMap<(i32, u32), QuarterAggregate> = BTreeMap::new();

    for r in records {
        let year = r.period_date.year();
        let quarter = quarter_of(r.period_date);
        let agg = groups
            .entry((year, quarter))
            .or_insert_with(|| QuarterAggregate {
                quarter_label: quarter_label(year, quarter),
                year,
                quarter,
                month_count: 0,
                last_period_date: r.period_date,
                amounts: LineItems::default(),
                net_profit_after_tax: Decimal::ZERO,
                discounted_net_profit: Decimal::ZERO,
                profit_margin_pct: None,
            });
        agg.month_count += 1;
        agg.last_period_date = agg.last_period_date.max(r.period_date);
        agg.amounts.accumulate(&r.amounts);
        agg.net_profit_after_tax += r.net_profit_after_tax;
        agg.discounted_net_profit += r.discounted_net_profit;
    }

    let quarters: Vec<QuarterAggregate> = groups
        .into_values()
        .map(|mut q| {
            q.profit_margin_pct = q.amounts.profit_margin_pct();
            q
        })
        .collect();
    debug!(quarters = quarters.len(), "quarters aggregated");
    quarters
}
