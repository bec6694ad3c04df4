use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::aggregation::quarterly::{aggregate_quarters, QuarterAggregate};
use crate::config::PipelineConfig;
use crate::error::PnlError;
use crate::forecast::projection::{forecast_scenarios, ForecastSet};
use crate::records::loader::{load_records, RawRow, RejectedRow};
use crate::records::metrics::{derive_records, zero_revenue_periods, MonthlyRecord};
use crate::time_value::{npv, npv_quarter_fraction};
use crate::types::{with_metadata, ComputationOutput, Frequency, LineItems, Money, Rate};
use crate::PnlResult;

#[cfg(feature = "summary")]
use crate::analysis::summary::{summarize, FinancialSummary};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Rows plus the configuration to run them under.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineInput {
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub config: PipelineConfig,
}

/// Present value of the historical net-profit stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpvReport {
    pub discount_rate: Rate,
    /// Σ NP_t / (1 + r)^t with t the period index
    pub npv: Money,
    pub total_net_profit: Money,
    /// npv / total net profit * 100
    pub npv_pct_of_profit: Option<Decimal>,
    /// Same flows under the quarter/4 exponent convention, for comparison only
    pub quarter_fraction_npv: Money,
    /// npv - quarter_fraction_npv
    pub convention_difference: Money,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub records: Vec<MonthlyRecord>,
    pub quarters: Vec<QuarterAggregate>,
    pub rejected_rows: Vec<RejectedRow>,
    pub dropped_missing_revenue: usize,
    pub zero_revenue_periods: Vec<String>,
    pub npv: NpvReport,
    pub monthly_forecast: ForecastSet,
    pub quarterly_forecast: ForecastSet,
    #[cfg(feature = "summary")]
    pub summary: FinancialSummary,
}

/// Output of the load + derive stages alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSet {
    pub records: Vec<MonthlyRecord>,
    pub rejected_rows: Vec<RejectedRow>,
    pub dropped_missing_revenue: usize,
    pub rows_read: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load rows and derive per-record metrics. Fails only when no row survives.
pub fn build_records(rows: &[RawRow], discount_rate: Rate) -> PnlResult<RecordSet> {
    let loaded = load_records(rows);
    if loaded.observations.is_empty() {
        return Err(PnlError::InsufficientData(format!(
            "No valid records among {} rows ({} rejected, {} without revenue)",
            loaded.rows_read,
            loaded.rejected.len(),
            loaded.dropped_missing_revenue
        )));
    }
    let records = derive_records(&loaded.observations, discount_rate)?;
    Ok(RecordSet {
        records,
        rejected_rows: loaded.rejected,
        dropped_missing_revenue: loaded.dropped_missing_revenue,
        rows_read: loaded.rows_read,
    })
}

/// Present value of the records' net profit, with the legacy convention
/// alongside for comparison.
pub fn npv_report(records: &[MonthlyRecord], discount_rate: Rate) -> PnlResult<NpvReport> {
    let flows: Vec<Money> = records.iter().map(|r| r.net_profit_after_tax).collect();
    let dated: Vec<_> = records
        .iter()
        .map(|r| (r.period_date, r.net_profit_after_tax))
        .collect();

    let value = npv(discount_rate, &flows)?;
    let legacy = npv_quarter_fraction(discount_rate, &dated)?;
    let total: Money = flows.iter().copied().sum();

    Ok(NpvReport {
        discount_rate,
        npv: value,
        total_net_profit: total,
        npv_pct_of_profit: crate::types::margin_pct(value, total),
        quarter_fraction_npv: legacy,
        convention_difference: value - legacy,
    })
}

/// Run the whole pipeline: load → derive → aggregate → forecast.
///
/// Bad rows and anomalies never abort the run; they are listed in the output
/// and repeated as warnings. Only an input with no usable row is an error.
pub fn run_pipeline(input: &PipelineInput) -> PnlResult<ComputationOutput<PipelineOutput>> {
    let start = Instant::now();
    let config = &input.config;
    config.validate()?;

    let set = build_records(&input.rows, config.discount_rate)?;
    let mut warnings = load_warnings(&set);
    let records = set.records;
    info!(
        records = records.len(),
        rejected = set.rejected_rows.len(),
        "pipeline started"
    );

    let zero_revenue = zero_revenue_periods(&records);
    if !zero_revenue.is_empty() {
        warnings.push(format!(
            "Profit margin undefined (zero revenue) for: {}",
            zero_revenue.join(", ")
        ));
    }

    let quarters = aggregate_quarters(&records);
    let npv = npv_report(&records, config.discount_rate)?;
    if !npv.convention_difference.is_zero() {
        warnings.push(format!(
            "Quarter-fraction discounting would report NPV {} (difference {}); period-index NPV is authoritative",
            npv.quarter_fraction_npv.round_dp(2),
            npv.convention_difference.round_dp(2)
        ));
    }

    // Records are sorted and non-empty, so the last one anchors the forecast.
    let last = &records[records.len() - 1];
    let monthly_series: Vec<LineItems> = records.iter().map(|r| r.amounts).collect();
    let monthly_forecast = forecast_scenarios(
        &monthly_series,
        last.period_date,
        Frequency::Monthly,
        config.monthly_horizon,
        &config.scenarios,
    )?;

    let quarterly_series: Vec<LineItems> = quarters.iter().map(|q| q.amounts).collect();
    let last_quarter_date = quarters
        .last()
        .map(|q| q.last_period_date)
        .unwrap_or(last.period_date);
    let quarterly_forecast = forecast_scenarios(
        &quarterly_series,
        last_quarter_date,
        Frequency::Quarterly,
        config.quarterly_horizon,
        &config.scenarios,
    )?;

    for forecast in [&monthly_forecast, &quarterly_forecast] {
        warnings.extend(forecast_warnings(forecast));
    }

    #[cfg(feature = "summary")]
    let summary = summarize(&records)?;

    debug!(warnings = warnings.len(), "pipeline finished");

    let output = PipelineOutput {
        records,
        quarters,
        rejected_rows: set.rejected_rows,
        dropped_missing_revenue: set.dropped_missing_revenue,
        zero_revenue_periods: zero_revenue,
        npv,
        monthly_forecast,
        quarterly_forecast,
        #[cfg(feature = "summary")]
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly P&L pipeline: load, derive, quarterly aggregation, NPV, compound-growth scenarios",
        &serde_json::json!({
            "discount_rate": config.discount_rate.to_string(),
            "discounting": "NPV = Σ CF_t / (1 + r)^t, t = 1-based period index",
            "growth": "g = (last / first)^(1/n) - 1 per line item",
            "monthly_horizon": config.monthly_horizon,
            "quarterly_horizon": config.quarterly_horizon,
            "scenario_multipliers": config.scenarios,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Quarterly aggregates plus the load audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterReport {
    pub quarters: Vec<QuarterAggregate>,
    pub rejected_rows: Vec<RejectedRow>,
    pub dropped_missing_revenue: usize,
}

/// Present value of an arbitrary cash-flow sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowValuation {
    pub discount_rate: Rate,
    pub periods: usize,
    pub undiscounted_total: Money,
    pub npv: Money,
}

fn load_warnings(set: &RecordSet) -> Vec<String> {
    let mut warnings = Vec::new();
    if !set.rejected_rows.is_empty() {
        warnings.push(format!(
            "{} of {} rows rejected",
            set.rejected_rows.len(),
            set.rows_read
        ));
    }
    if set.dropped_missing_revenue > 0 {
        warnings.push(format!(
            "{} rows dropped for missing revenue",
            set.dropped_missing_revenue
        ));
    }
    warnings
}

fn forecast_warnings(forecast: &ForecastSet) -> Vec<String> {
    let mut warnings: Vec<String> = forecast
        .historical_growth
        .anomalies
        .iter()
        .map(|a| {
            format!(
                "{} forecast flagged: {} growth undefined ({}); held flat",
                forecast.frequency, a.line_item, a.reason
            )
        })
        .collect();
    for s in &forecast.scenarios {
        if let Some(step) = s.truncated_at {
            warnings.push(format!(
                "{} {} forecast truncated at step {} of {}: projected values leave the representable range",
                forecast.frequency,
                s.scenario,
                step,
                forecast.horizon
            ));
        }
    }
    warnings
}

/// Loader and deriver only.
pub fn run_records(input: &PipelineInput) -> PnlResult<ComputationOutput<RecordSet>> {
    let start = Instant::now();
    input.config.validate()?;
    let set = build_records(&input.rows, input.config.discount_rate)?;
    let warnings = load_warnings(&set);
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly record load with net profit, margin and period-index discounting",
        &serde_json::json!({ "discount_rate": input.config.discount_rate.to_string() }),
        warnings,
        elapsed,
        set,
    ))
}

/// Loader, deriver and quarterly aggregation.
pub fn run_quarters(input: &PipelineInput) -> PnlResult<ComputationOutput<QuarterReport>> {
    let start = Instant::now();
    input.config.validate()?;
    let set = build_records(&input.rows, input.config.discount_rate)?;
    let warnings = load_warnings(&set);
    let report = QuarterReport {
        quarters: aggregate_quarters(&set.records),
        rejected_rows: set.rejected_rows,
        dropped_missing_revenue: set.dropped_missing_revenue,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Calendar-quarter sums, quarter = ceil(month / 3)",
        &serde_json::json!({ "discount_rate": input.config.discount_rate.to_string() }),
        warnings,
        elapsed,
        report,
    ))
}

/// Scenario forecast at one frequency, horizon taken from the config.
pub fn run_forecast(
    input: &PipelineInput,
    frequency: Frequency,
) -> PnlResult<ComputationOutput<ForecastSet>> {
    let start = Instant::now();
    let config = &input.config;
    config.validate()?;
    let set = build_records(&input.rows, config.discount_rate)?;
    let mut warnings = load_warnings(&set);

    let (series, baseline_date, horizon): (Vec<LineItems>, _, _) = match frequency {
        Frequency::Monthly => (
            set.records.iter().map(|r| r.amounts).collect(),
            set.records[set.records.len() - 1].period_date,
            config.monthly_horizon,
        ),
        Frequency::Quarterly => {
            let quarters = aggregate_quarters(&set.records);
            let last = quarters
                .last()
                .map(|q| q.last_period_date)
                .ok_or_else(|| PnlError::InsufficientData("No quarters to forecast from".into()))?;
            (
                quarters.iter().map(|q| q.amounts).collect(),
                last,
                config.quarterly_horizon,
            )
        }
    };

    let forecast = forecast_scenarios(&series, baseline_date, frequency, horizon, &config.scenarios)?;
    warnings.extend(forecast_warnings(&forecast));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Compound-growth scenario projection, value_k = value_{k-1} * (1 + g)",
        &serde_json::json!({
            "frequency": frequency,
            "horizon": horizon,
            "scenario_multipliers": config.scenarios,
        }),
        warnings,
        elapsed,
        forecast,
    ))
}

/// NPV of a plain cash-flow sequence, first flow at t = 1.
pub fn value_cash_flows(
    cash_flows: &[Money],
    discount_rate: Rate,
) -> PnlResult<ComputationOutput<CashFlowValuation>> {
    let start = Instant::now();
    if cash_flows.is_empty() {
        return Err(PnlError::InsufficientData(
            "NPV requires at least one cash flow".into(),
        ));
    }
    let valuation = CashFlowValuation {
        discount_rate,
        periods: cash_flows.len(),
        undiscounted_total: cash_flows.iter().copied().sum(),
        npv: npv(discount_rate, cash_flows)?,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "NPV = Σ CF_t / (1 + r)^t, t = 1..n",
        &serde_json::json!({ "discount_rate": discount_rate.to_string() }),
        Vec::new(),
        elapsed,
        valuation,
    ))
}
