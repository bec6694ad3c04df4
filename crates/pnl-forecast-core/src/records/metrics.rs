use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PnlError;
use crate::records::loader::PeriodObservation;
use crate::time_value::discount_factor;
use crate::types::{LineItems, Money, Rate};
use crate::PnlResult;

/// One month of figures with derived metrics attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub period_label: String,
    pub period_date: NaiveDate,
    /// 1-based position in the chronologically sorted sequence (t)
    pub period_index: u32,
    #[serde(flatten)]
    pub amounts: LineItems,
    /// revenue - opex - tax - finance cost - SG&A
    pub net_profit_after_tax: Money,
    /// net / revenue * 100; `None` when revenue is zero
    pub profit_margin_pct: Option<Decimal>,
    /// 1 / (1 + r)^t
    pub discount_factor: Decimal,
    pub discounted_net_profit: Money,
}

/// Attach derived metrics to a single observation at period index `t`.
pub fn derive_record(
    obs: &PeriodObservation,
    period_index: u32,
    discount_rate: Rate,
) -> PnlResult<MonthlyRecord> {
    let net = obs
        .amounts
        .checked_net_profit()
        .ok_or_else(|| PnlError::InvalidInput {
            field: "net_profit_after_tax".into(),
            reason: format!("net profit for {} is out of range", obs.period_label),
        })?;
    let df = discount_factor(discount_rate, period_index)?;
    let discounted = net.checked_mul(df).ok_or_else(|| PnlError::InvalidInput {
        field: "discount_rate".into(),
        reason: format!(
            "discounted net profit at period {period_index} overflows (factor {df})"
        ),
    })?;
    Ok(MonthlyRecord {
        period_label: obs.period_label.clone(),
        period_date: obs.period_date,
        period_index,
        amounts: obs.amounts,
        net_profit_after_tax: net,
        profit_margin_pct: obs.amounts.profit_margin_pct(),
        discount_factor: df,
        discounted_net_profit: discounted,
    })
}

/// Derive metrics for the whole (already sorted) sequence, numbering periods
/// from 1 in the order given.
pub fn derive_records(
    observations: &[PeriodObservation],
    discount_rate: Rate,
) -> PnlResult<Vec<MonthlyRecord>> {
    let records = observations
        .iter()
        .zip(1u32..)
        .map(|(obs, t)| derive_record(obs, t, discount_rate))
        .collect::<PnlResult<Vec<_>>>()?;
    debug!(count = records.len(), %discount_rate, "metrics derived");
    Ok(records)
}

/// Labels of periods whose margin is undefined because revenue was zero.
pub fn zero_revenue_periods(records: &[MonthlyRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.amounts.revenue.is_zero())
        .map(|r| r.period_label.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn obs(label: &str, month: u32, revenue: Decimal, opex: Decimal) -> PeriodObservation {
        PeriodObservation {
            period_label: label.into(),
            period_date: NaiveDate::from_ymd_opt(2023, month, 1).unwrap(),
            amounts: LineItems {
                revenue,
                operating_expense: opex,
                tax: dec!(3.3),
                finance_cost: dec!(1.1),
                sga_expense: dec!(2.2),
            },
        }
    }

    #[test]
    fn test_net_profit_and_margin() {
        let r = derive_record(&obs("Jan-23", 1, dec!(100), dec!(43.4)), 1, dec!(0.06)).unwrap();
        assert_eq!(r.net_profit_after_tax, dec!(50.0));
        assert_eq!(r.profit_margin_pct, Some(dec!(50)));
    }

    #[test]
    fn test_period_index_is_positional() {
        let seq = vec![
            obs("Jan-23", 1, dec!(100), dec!(0)),
            obs("Mar-23", 3, dec!(100), dec!(0)),
            obs("Jul-23", 7, dec!(100), dec!(0)),
        ];
        let records = derive_records(&seq, dec!(0.06)).unwrap();
        let idx: Vec<u32> = records.iter().map(|r| r.period_index).collect();
        assert_eq!(idx, vec![1, 2, 3]);
    }

    #[test]
    fn test_discounted_net_profit() {
        let r = derive_record(&obs("Feb-23", 2, dec!(112.36), dec!(0)), 2, dec!(0.06)).unwrap();
        // net = 112.36 - 6.6 = 105.76; / 1.1236
        assert!((r.discounted_net_profit - dec!(94.1260)).abs() < dec!(0.001));
    }

    #[test]
    fn test_zero_revenue_does_not_fail() {
        let records = derive_records(&[obs("Jan-23", 1, dec!(0), dec!(0))], dec!(0.06)).unwrap();
        assert!(records[0].profit_margin_pct.is_none());
        assert_eq!(zero_revenue_periods(&records), vec!["Jan-23".to_string()]);
    }

    #[test]
    fn test_steeply_negative_rate_errors_instead_of_overflowing() {
        let o = obs("Feb-23", 2, dec!(100), dec!(0));
        // (1 - 0.99)^13 = 1e-26, so the factor is 1e26 and 93.4e26 still fits
        assert!(derive_record(&o, 13, dec!(-0.99)).is_ok());
        // at t = 14 the factor is 1e28 and the product leaves Decimal range
        assert!(matches!(
            derive_record(&o, 14, dec!(-0.99)),
            Err(PnlError::InvalidInput { ref field, .. }) if field == "discount_rate"
        ));
    }
}
