use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::aggregation::quarterly::quarter_of;
use crate::error::PnlError;
use crate::types::{Money, Rate};
use crate::PnlResult;

fn validate_rate(rate: Rate) -> PnlResult<()> {
    if rate <= dec!(-1) {
        return Err(PnlError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Ok(())
}

/// Discount factor for period index `t` (1-based): `1 / (1 + r)^t`.
pub fn discount_factor(rate: Rate, t: u32) -> PnlResult<Decimal> {
    validate_rate(rate)?;
    let compounded = (Decimal::ONE + rate)
        .checked_powi(i64::from(t))
        .ok_or_else(|| PnlError::InvalidInput {
            field: "rate".into(),
            reason: format!("(1 + {rate})^{t} overflows"),
        })?;
    if compounded.is_zero() {
        return Err(PnlError::DivisionByZero {
            context: format!("discount factor at period {t}"),
        });
    }
    Decimal::ONE
        .checked_div(compounded)
        .ok_or_else(|| PnlError::InvalidInput {
            field: "rate".into(),
            reason: format!("1 / (1 + {rate})^{t} overflows"),
        })
}

/// Net Present Value of a series of cash flows, `Σ CF_t / (1 + r)^t`.
///
/// The first flow sits at t = 1, so it is discounted one full period. This
/// is the period-index convention used throughout the pipeline.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> PnlResult<Money> {
    validate_rate(rate)?;

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (i, cf) in cash_flows.iter().enumerate() {
        discount = discount
            .checked_mul(one_plus_r)
            .ok_or_else(|| PnlError::InvalidInput {
                field: "cash_flows".into(),
                reason: format!("discount factor overflows at period {}", i + 1),
            })?;
        if discount.is_zero() {
            return Err(PnlError::DivisionByZero {
                context: format!("NPV discount factor at period {}", i + 1),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| PnlError::InvalidInput {
                field: "cash_flows".into(),
                reason: format!("discounted flow at period {} overflows", i + 1),
            })?;
    }

    Ok(result)
}

/// Present value of a level payment received at the end of each of `nper`
/// periods: `C * (1 - (1 + r)^-n) / r`, or `C * n` when r is zero.
pub fn annuity_present_value(rate: Rate, nper: u32, payment: Money) -> PnlResult<Money> {
    validate_rate(rate)?;
    if rate.is_zero() {
        return payment
            .checked_mul(Decimal::from(nper))
            .ok_or_else(|| PnlError::InvalidInput {
                field: "payment".into(),
                reason: format!("{payment} x {nper} overflows"),
            });
    }

    let factor = (Decimal::ONE + rate)
        .checked_powi(i64::from(nper))
        .ok_or_else(|| PnlError::InvalidInput {
            field: "nper".into(),
            reason: format!("(1 + {rate})^{nper} overflows"),
        })?;

    if factor.is_zero() {
        return Err(PnlError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }

    let overflow = || PnlError::InvalidInput {
        field: "payment".into(),
        reason: format!("annuity of {payment} over {nper} periods overflows"),
    };
    let annuity_factor = Decimal::ONE
        .checked_div(factor)
        .map(|inv| Decimal::ONE - inv)
        .and_then(|f| f.checked_div(rate))
        .ok_or_else(overflow)?;
    payment.checked_mul(annuity_factor).ok_or_else(overflow)
}

/// NPV under the older quarter-fraction convention: each flow is discounted
/// by `(1 + r)^(q / 4)` where `q = (year - first_year) * 4 + quarter`.
///
/// Only used to report how far that convention drifts from [`npv`]; it is
/// not a valuation in its own right.
pub fn npv_quarter_fraction(rate: Rate, dated_flows: &[(NaiveDate, Money)]) -> PnlResult<Money> {
    validate_rate(rate)?;
    let Some(first_year) = dated_flows.iter().map(|(d, _)| d.year()).min() else {
        return Ok(Decimal::ZERO);
    };

    let one_plus_r = Decimal::ONE + rate;
    let mut result = Decimal::ZERO;

    for (date, amount) in dated_flows {
        let quarter_number = (date.year() - first_year) * 4 + quarter_of(*date) as i32;
        let exponent = Decimal::from(quarter_number) / dec!(4);
        let discount = one_plus_r
            .checked_powd(exponent)
            .ok_or_else(|| PnlError::InvalidInput {
                field: "rate".into(),
                reason: format!("(1 + {rate})^{exponent} is not representable"),
            })?;
        if discount.is_zero() {
            return Err(PnlError::DivisionByZero {
                context: format!("quarter-fraction discount factor for {date}"),
            });
        }
        result = amount
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| PnlError::InvalidInput {
                field: "rate".into(),
                reason: format!("quarter-fraction discounted flow for {date} overflows"),
            })?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(100), dec!(100)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // 100/1.1 + 100/1.21 = 90.909 + 82.645 = 173.55
        assert!((result - dec!(173.5537)).abs() < dec!(0.001));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(npv(dec!(-1), &[dec!(1)]).is_err());
    }

    #[test]
    fn test_npv_empty_is_zero() {
        assert_eq!(npv(dec!(0.06), &[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_discount_factor_matches_npv_of_single_flow() {
        let df = discount_factor(dec!(0.06), 3).unwrap();
        let single = npv(dec!(0.06), &[dec!(0), dec!(0), dec!(1)]).unwrap();
        assert!((df - single).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_annuity_closed_form() {
        // 100 * (1 - 1/1.08^10) / 0.08 ≈ 671.01
        let result = annuity_present_value(dec!(0.08), 10, dec!(100)).unwrap();
        assert!((result - dec!(671.008)).abs() < dec!(0.01));
    }

    #[test]
    fn test_quarter_fraction_differs_from_period_index() {
        let flows = vec![
            (NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), dec!(100)),
            (NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(), dec!(100)),
        ];
        let legacy = npv_quarter_fraction(dec!(0.06), &flows).unwrap();
        let standard = npv(dec!(0.06), &[dec!(100), dec!(100)]).unwrap();
        // Both January and February sit in quarter 1: discounted by 1.06^0.25
        assert!(legacy > standard);
    }

    #[test]
    fn test_npv_overflow_is_an_error_not_a_panic() {
        let flows = vec![dec!(975); 14];
        assert!(npv(dec!(-0.99), &flows[..12]).is_ok());
        assert!(matches!(
            npv(dec!(-0.99), &flows),
            Err(PnlError::InvalidInput { .. })
        ));
    }
}
