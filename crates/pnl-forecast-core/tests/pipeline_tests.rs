use pnl_forecast_core::aggregation::quarterly::aggregate_quarters;
use pnl_forecast_core::forecast::scenario::ScenarioKind;
use pnl_forecast_core::pipeline::{build_records, npv_report, run_pipeline, PipelineInput};
use pnl_forecast_core::records::loader::{load_records, RawRow, RejectionKind};
use pnl_forecast_core::{PipelineConfig, PnlError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

fn row(label: &str, revenue: i64, opex: i64, tax: i64, fin: i64, sga: i64) -> RawRow {
    serde_json::from_value(json!({
        "monthes": label,
        "revenue": revenue,
        "opex": opex,
        "tax": tax,
        "fianance cost": fin,
        "sg@a": sga,
    }))
    .unwrap()
}

fn year_of_rows() -> Vec<RawRow> {
    let months = [
        "Jan-23", "Feb-23", "Mar-23", "Apr-23", "May-23", "Jun-23", "Jul-23", "Aug-23", "Sep-23",
        "Oct-23", "Nov-23", "Dec-23",
    ];
    months
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let i = i as i64;
            row(m, 1000 + 50 * i, 400 + 10 * i, 60, 25, 120 + 5 * i)
        })
        .collect()
}

fn input(rows: Vec<RawRow>) -> PipelineInput {
    PipelineInput {
        rows,
        config: PipelineConfig::default(),
    }
}

// ===========================================================================
// Loader + deriver
// ===========================================================================

#[test]
fn test_net_profit_identity_holds_for_every_record() {
    let out = run_pipeline(&input(year_of_rows())).unwrap();
    for r in &out.result.records {
        let a = &r.amounts;
        assert_eq!(
            r.net_profit_after_tax,
            a.revenue - a.operating_expense - a.tax - a.finance_cost - a.sga_expense
        );
    }
}

#[test]
fn test_records_sorted_and_indexed_regardless_of_input_order() {
    let mut rows = year_of_rows();
    rows.reverse();
    let set = build_records(&rows, dec!(0.06)).unwrap();
    let labels: Vec<&str> = set.records.iter().map(|r| r.period_label.as_str()).collect();
    assert_eq!(labels[0], "Jan-23");
    assert_eq!(labels[11], "Dec-23");
    let idx: Vec<u32> = set.records.iter().map(|r| r.period_index).collect();
    assert_eq!(idx, (1..=12).collect::<Vec<u32>>());
}

#[test]
fn test_csv_style_string_cells_with_padded_headers() {
    let rows: Vec<RawRow> = vec![serde_json::from_value(json!({
        "monthes ": "Jan-23",
        " revenue": " 1,000 ",
        "opex ": "400",
        " tax": "60",
        "fianance cost": "25",
        "sg@a  ": "120",
    }))
    .unwrap()];
    let out = load_records(&rows);
    assert_eq!(out.observations.len(), 1);
    assert_eq!(out.observations[0].amounts.net_profit(), dec!(395));
}

#[test]
fn test_rejected_rows_are_reported_not_fatal() {
    let mut rows = year_of_rows();
    rows.push(row("January-2024", 1, 0, 0, 0, 0));
    rows.push(row("13-24", 1, 0, 0, 0, 0));
    let out = run_pipeline(&input(rows)).unwrap();
    assert_eq!(out.result.records.len(), 12);
    assert_eq!(out.result.rejected_rows.len(), 2);
    assert!(out
        .result
        .rejected_rows
        .iter()
        .all(|r| r.kind == RejectionKind::ParseError));
}

// ===========================================================================
// Aggregation
// ===========================================================================

#[test]
fn test_quarters_partition_revenue() {
    let out = run_pipeline(&input(year_of_rows())).unwrap();
    let monthly: Decimal = out.result.records.iter().map(|r| r.amounts.revenue).sum();
    let quarterly: Decimal = out.result.quarters.iter().map(|q| q.amounts.revenue).sum();
    assert_eq!(monthly, quarterly);
    let profit_m: Decimal = out.result.records.iter().map(|r| r.net_profit_after_tax).sum();
    let profit_q: Decimal = out.result.quarters.iter().map(|q| q.net_profit_after_tax).sum();
    assert_eq!(profit_m, profit_q);
    assert_eq!(out.result.quarters.len(), 4);
}

#[test]
fn test_aggregation_is_deterministic() {
    let set = build_records(&year_of_rows(), dec!(0.06)).unwrap();
    assert_eq!(aggregate_quarters(&set.records), aggregate_quarters(&set.records));
}

#[test]
fn test_zero_revenue_month_contributes_to_quarter() {
    let rows = vec![row("Jan-23", 0, 10, 0, 0, 0), row("Feb-23", 100, 10, 0, 0, 0)];
    let out = run_pipeline(&input(rows)).unwrap();
    assert!(out.result.records[0].profit_margin_pct.is_none());
    assert_eq!(out.result.quarters[0].amounts.revenue, dec!(100));
    assert_eq!(out.result.quarters[0].month_count, 2);
    assert_eq!(out.result.zero_revenue_periods, vec!["Jan-23".to_string()]);
}

// ===========================================================================
// NPV
// ===========================================================================

#[test]
fn test_npv_report_sums_discounted_records() {
    let set = build_records(&year_of_rows(), dec!(0.06)).unwrap();
    let report = npv_report(&set.records, dec!(0.06)).unwrap();
    let per_record: Decimal = set.records.iter().map(|r| r.discounted_net_profit).sum();
    assert!((report.npv - per_record).abs() < dec!(0.0000001));
    assert!(report.npv < report.total_net_profit);
    assert_eq!(
        report.convention_difference,
        report.npv - report.quarter_fraction_npv
    );
}

#[test]
fn test_quarter_fraction_divergence_is_warned() {
    let out = run_pipeline(&input(year_of_rows())).unwrap();
    assert!(out
        .warnings
        .iter()
        .any(|w| w.contains("Quarter-fraction discounting")));
}

// ===========================================================================
// Forecast
// ===========================================================================

#[test]
fn test_three_periods_of_ten_percent_growth() {
    let rows = vec![
        row("Jan-23", 100, 0, 0, 0, 0),
        row("Feb-23", 110, 0, 0, 0, 0),
        row("Mar-23", 121, 0, 0, 0, 0),
    ];
    let mut inp = input(rows);
    inp.config.monthly_horizon = 1;
    let out = run_pipeline(&inp).unwrap();

    let nets: Vec<Decimal> = out.result.records.iter().map(|r| r.net_profit_after_tax).collect();
    assert_eq!(nets, vec![dec!(100), dec!(110), dec!(121)]);

    let set = &out.result.monthly_forecast;
    assert!(!set.is_flagged());
    // g = (121/100)^(1/3) - 1 ≈ 0.06560
    let g = set.historical_growth.rates.revenue;
    assert!((g - dec!(0.06560)).abs() < dec!(0.0001), "got {g}");

    let moderate = set.scenario(ScenarioKind::Moderate).unwrap();
    assert_eq!(moderate.points.len(), 1);
    assert_eq!(moderate.points[0].period_label, "Apr-2023");
    assert!((moderate.points[0].amounts.revenue - dec!(128.94)).abs() < dec!(0.01));
}

#[test]
fn test_default_horizons() {
    let out = run_pipeline(&input(year_of_rows())).unwrap();
    for s in &out.result.monthly_forecast.scenarios {
        assert_eq!(s.points.len(), 60);
    }
    for s in &out.result.quarterly_forecast.scenarios {
        assert_eq!(s.points.len(), 20);
    }
    assert_eq!(
        out.result.quarterly_forecast.scenarios[0].points[0].period_label,
        "Q1-2024"
    );
}

#[test]
fn test_anomalous_base_is_flagged_not_swallowed() {
    // finance cost starts at zero: no compound growth can be fitted
    let rows = vec![
        row("Jan-23", 100, 10, 5, 0, 5),
        row("Feb-23", 110, 10, 5, 3, 5),
        row("Mar-23", 120, 10, 5, 4, 5),
    ];
    let out = run_pipeline(&input(rows)).unwrap();
    let set = &out.result.monthly_forecast;
    assert!(set.is_flagged());
    assert!(set.scenarios.iter().all(|s| s.flagged));
    assert!(out
        .warnings
        .iter()
        .any(|w| w.contains("monthly forecast flagged") && w.contains("Finance Cost")));
}

#[test]
fn test_runaway_cost_growth_truncates_forecast_but_keeps_history() {
    // SG&A goes 1 -> 500 in three months: ~694% a month compounds out of range
    let rows = vec![
        row("Jan-23", 1000, 0, 0, 0, 1),
        row("Feb-23", 1000, 0, 0, 0, 2),
        row("Mar-23", 1000, 0, 0, 0, 500),
    ];
    let out = run_pipeline(&input(rows)).unwrap();

    assert_eq!(out.result.records.len(), 3);
    assert_eq!(out.result.quarters.len(), 1);
    assert_eq!(out.result.npv.total_net_profit, dec!(2497));

    let monthly = &out.result.monthly_forecast;
    assert!(monthly.is_flagged());
    for s in &monthly.scenarios {
        let step = s.truncated_at.expect("every scenario leaves range");
        assert!(step <= 60);
        assert_eq!(s.points.len() as u32, step - 1);
        assert!(s.flagged);
    }
    assert!(!out.result.quarterly_forecast.is_flagged());
    assert!(out
        .warnings
        .iter()
        .any(|w| w.starts_with("monthly Optimistic forecast truncated at step")));
}

#[test]
fn test_steep_negative_rate_is_an_error_not_a_panic() {
    let months = [
        "Jan-23", "Feb-23", "Mar-23", "Apr-23", "May-23", "Jun-23", "Jul-23", "Aug-23", "Sep-23",
        "Oct-23", "Nov-23", "Dec-23", "Jan-24", "Feb-24",
    ];
    let rows: Vec<RawRow> = months.iter().map(|m| row(m, 1000, 25, 0, 0, 0)).collect();
    let mut inp = input(rows);
    inp.config.discount_rate = dec!(-0.99);
    assert!(inp.config.validate().is_ok());
    assert!(matches!(
        run_pipeline(&inp),
        Err(PnlError::InvalidInput { .. })
    ));
}

#[test]
fn test_custom_config_is_threaded_through() {
    let mut inp = input(year_of_rows());
    inp.config.discount_rate = dec!(0.10);
    inp.config.monthly_horizon = 6;
    inp.config.quarterly_horizon = 2;
    let out = run_pipeline(&inp).unwrap();
    assert_eq!(out.result.npv.discount_rate, dec!(0.10));
    assert_eq!(out.result.monthly_forecast.scenarios[0].points.len(), 6);
    assert_eq!(out.result.quarterly_forecast.scenarios[0].points.len(), 2);
}

#[test]
fn test_empty_input_is_insufficient_data() {
    assert!(matches!(
        run_pipeline(&input(vec![])),
        Err(PnlError::InsufficientData(_))
    ));
}

#[test]
fn test_pipeline_output_serializes() {
    let out = run_pipeline(&input(year_of_rows())).unwrap();
    let v = serde_json::to_value(&out).unwrap();
    assert!(v["result"]["records"][0]["revenue"].is_string());
    assert_eq!(v["result"]["records"][0]["period_index"], json!(1));
    assert_eq!(v["result"]["quarters"][0]["quarter_label"], json!("Q1-2023"));
}
