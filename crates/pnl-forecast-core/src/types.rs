use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.06 = 6%). Never as percentages.
pub type Rate = Decimal;

/// The five raw P&L line items carried by every period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItem {
    Revenue,
    OperatingExpense,
    Tax,
    FinanceCost,
    SgaExpense,
}

impl LineItem {
    pub const ALL: [LineItem; 5] = [
        LineItem::Revenue,
        LineItem::OperatingExpense,
        LineItem::Tax,
        LineItem::FinanceCost,
        LineItem::SgaExpense,
    ];

    /// Cost lines only, in reporting order.
    pub const COSTS: [LineItem; 4] = [
        LineItem::OperatingExpense,
        LineItem::Tax,
        LineItem::FinanceCost,
        LineItem::SgaExpense,
    ];

    /// Column name used by the upstream CSV files (spelling preserved verbatim).
    pub fn column_name(&self) -> &'static str {
        match self {
            LineItem::Revenue => "revenue",
            LineItem::OperatingExpense => "opex",
            LineItem::Tax => "tax",
            LineItem::FinanceCost => "fianance cost",
            LineItem::SgaExpense => "sg@a",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LineItem::Revenue => "Revenue",
            LineItem::OperatingExpense => "Operating Expense",
            LineItem::Tax => "Tax",
            LineItem::FinanceCost => "Finance Cost",
            LineItem::SgaExpense => "SG&A",
        }
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Raw monetary amounts for one period (a month, a quarter, or a projected step).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItems {
    pub revenue: Money,
    pub operating_expense: Money,
    pub tax: Money,
    pub finance_cost: Money,
    pub sga_expense: Money,
}

impl LineItems {
    pub fn get(&self, item: LineItem) -> Money {
        match item {
            LineItem::Revenue => self.revenue,
            LineItem::OperatingExpense => self.operating_expense,
            LineItem::Tax => self.tax,
            LineItem::FinanceCost => self.finance_cost,
            LineItem::SgaExpense => self.sga_expense,
        }
    }

    pub fn get_mut(&mut self, item: LineItem) -> &mut Money {
        match item {
            LineItem::Revenue => &mut self.revenue,
            LineItem::OperatingExpense => &mut self.operating_expense,
            LineItem::Tax => &mut self.tax,
            LineItem::FinanceCost => &mut self.finance_cost,
            LineItem::SgaExpense => &mut self.sga_expense,
        }
    }

    /// Sum of the four cost lines.
    pub fn total_costs(&self) -> Money {
        self.operating_expense + self.tax + self.finance_cost + self.sga_expense
    }

    /// revenue - opex - tax - finance cost - SG&A, exact.
    pub fn net_profit(&self) -> Money {
        self.revenue - self.operating_expense - self.tax - self.finance_cost - self.sga_expense
    }

    /// [`Self::net_profit`], or `None` when the result leaves `Decimal` range.
    pub fn checked_net_profit(&self) -> Option<Money> {
        LineItem::COSTS
            .iter()
            .try_fold(self.revenue, |acc, &item| acc.checked_sub(self.get(item)))
    }

    /// Net profit as a percentage of revenue. `None` when revenue is zero.
    pub fn profit_margin_pct(&self) -> Option<Decimal> {
        margin_pct(self.checked_net_profit()?, self.revenue)
    }

    /// Element-wise sum.
    pub fn accumulate(&mut self, other: &LineItems) {
        for item in LineItem::ALL {
            *self.get_mut(item) += other.get(item);
        }
    }
}

/// `numerator / revenue * 100`, undefined for zero revenue or when the
/// ratio is not representable.
pub fn margin_pct(numerator: Money, revenue: Money) -> Option<Decimal> {
    if revenue.is_zero() {
        return None;
    }
    numerator.checked_div(revenue)?.checked_mul(dec!(100))
}

/// Granularity of a projected series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Quarterly,
}

impl Frequency {
    pub fn months_per_period(&self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Monthly => f.write_str("monthly"),
            Frequency::Quarterly => f.write_str("quarterly"),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
