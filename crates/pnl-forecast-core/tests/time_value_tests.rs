use pnl_forecast_core::aggregation::growth::historical_growth;
use pnl_forecast_core::config::ScenarioMultipliers;
use pnl_forecast_core::forecast::scenario::build_scenarios;
use pnl_forecast_core::time_value::{annuity_present_value, discount_factor, npv};
use pnl_forecast_core::{LineItem, LineItems};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Present value
// ===========================================================================

#[test]
fn test_npv_decreases_as_rate_rises() {
    let flows = vec![dec!(120), dec!(80), dec!(150), dec!(95), dec!(110)];
    let rates = [dec!(0), dec!(0.01), dec!(0.06), dec!(0.10), dec!(0.25)];
    let values: Vec<Decimal> = rates.iter().map(|r| npv(*r, &flows).unwrap()).collect();
    for pair in values.windows(2) {
        assert!(pair[0] > pair[1], "{} should exceed {}", pair[0], pair[1]);
    }
}

#[test]
fn test_npv_matches_annuity_closed_form() {
    for (c, n, r) in [
        (dec!(100), 12u32, dec!(0.06)),
        (dec!(2500.75), 60, dec!(0.005)),
        (dec!(1), 1, dec!(0.2)),
    ] {
        let flows = vec![c; n as usize];
        let summed = npv(r, &flows).unwrap();
        let closed = annuity_present_value(r, n, c).unwrap();
        assert!(
            (summed - closed).abs() < dec!(0.000001),
            "C={c} n={n} r={r}: {summed} vs {closed}"
        );
    }
}

#[test]
fn test_first_flow_is_discounted_one_period() {
    // 106 / 1.06 = 100
    assert_eq!(npv(dec!(0.06), &[dec!(106)]).unwrap(), dec!(100));
}

#[test]
fn test_discount_factor_at_zero_rate_is_one() {
    assert_eq!(discount_factor(dec!(0), 24).unwrap(), Decimal::ONE);
}

#[test]
fn test_annuity_zero_rate() {
    assert_eq!(annuity_present_value(dec!(0), 5, dec!(20)).unwrap(), dec!(100));
}

// ===========================================================================
// Scenario growth rates
// ===========================================================================

#[test]
fn test_scenario_rates_are_exact_multiples_of_history() {
    let series = vec![
        LineItems {
            revenue: dec!(1000),
            operating_expense: dec!(400),
            tax: dec!(60),
            finance_cost: dec!(25),
            sga_expense: dec!(120),
        },
        LineItems {
            revenue: dec!(1550),
            operating_expense: dec!(510),
            tax: dec!(75),
            finance_cost: dec!(20),
            sga_expense: dec!(175),
        },
    ];
    let growth = historical_growth(&series).unwrap();
    let [conservative, moderate, optimistic] =
        build_scenarios(&growth, &ScenarioMultipliers::default());
    for item in LineItem::ALL {
        let m = moderate.growth_rates.get(item);
        assert_eq!(m, growth.rates.get(item));
        assert_eq!(conservative.growth_rates.get(item), dec!(0.5) * m);
        assert_eq!(optimistic.growth_rates.get(item), dec!(1.5) * m);
    }
    // finance cost shrank, so its rate is negative
    assert!(moderate.growth_rates.finance_cost < Decimal::ZERO);
}
