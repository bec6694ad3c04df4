//! Commentary stage.
//!
//! A [`Commentator`] reads a finished [`PipelineOutput`] and writes prose
//! about it. It only ever gets a shared borrow, so commentary can never feed
//! back into the numbers.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Instant;

use crate::forecast::scenario::ScenarioKind;
use crate::pipeline::PipelineOutput;
use crate::types::{with_metadata, ComputationOutput};
use crate::PnlResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentarySection {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commentary {
    pub author: String,
    pub sections: Vec<CommentarySection>,
}

/// Anything that can turn pipeline results into narrative text.
pub trait Commentator {
    fn name(&self) -> &str;
    fn comment(&self, output: &PipelineOutput) -> PnlResult<Commentary>;
}

/// Deterministic commentary built from fixed templates: profitability,
/// present value, forecast and data validation.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedCommentator;

impl Commentator for RuleBasedCommentator {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn comment(&self, output: &PipelineOutput) -> PnlResult<Commentary> {
        Ok(Commentary {
            author: self.name().to_string(),
            sections: vec![
                profitability(output),
                present_value(output),
                forecast(output),
                validation(output),
            ],
        })
    }
}

/// Run a commentator and wrap its text in the usual output envelope.
pub fn generate_commentary(
    commentator: &dyn Commentator,
    output: &PipelineOutput,
) -> PnlResult<ComputationOutput<Commentary>> {
    let start = Instant::now();
    let commentary = commentator.comment(output)?;
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Narrative commentary over pipeline results",
        &serde_json::json!({ "commentator": commentator.name() }),
        Vec::new(),
        elapsed,
        commentary,
    ))
}

fn profitability(output: &PipelineOutput) -> CommentarySection {
    let revenue: rust_decimal::Decimal = output.records.iter().map(|r| r.amounts.revenue).sum();
    let profit = output.npv.total_net_profit;
    let mut body = format!(
        "{} months loaded across {} quarters. Revenue totals {} and net profit after tax {}.",
        output.records.len(),
        output.quarters.len(),
        revenue.round_dp(2),
        profit.round_dp(2)
    );
    if let Some(margin) = crate::types::margin_pct(profit, revenue) {
        let _ = write!(body, " Overall net margin is {}%.", margin.round_dp(1));
    }
    if let (Some(best), Some(worst)) = (
        output.quarters.iter().max_by_key(|q| q.net_profit_after_tax),
        output.quarters.iter().min_by_key(|q| q.net_profit_after_tax),
    ) {
        if best.quarter_label != worst.quarter_label {
            let _ = write!(
                body,
                " Strongest quarter was {} ({}), weakest {} ({}).",
                best.quarter_label,
                best.net_profit_after_tax.round_dp(2),
                worst.quarter_label,
                worst.net_profit_after_tax.round_dp(2)
            );
        }
    }
    CommentarySection {
        title: "Profitability".into(),
        body,
    }
}

fn present_value(output: &PipelineOutput) -> CommentarySection {
    let npv = &output.npv;
    let mut body = format!(
        "Discounting net profit at {}% per period gives a present value of {}.",
        (npv.discount_rate * rust_decimal::Decimal::ONE_HUNDRED).round_dp(2),
        npv.npv.round_dp(2)
    );
    if let Some(pct) = npv.npv_pct_of_profit {
        let _ = write!(body, " That is {}% of undiscounted profit.", pct.round_dp(1));
    }
    CommentarySection {
        title: "Present Value".into(),
        body,
    }
}

fn forecast(output: &PipelineOutput) -> CommentarySection {
    let set = &output.monthly_forecast;
    let mut body = format!(
        "Projected {} months from {} on historical compound growth.",
        set.horizon, set.baseline_date
    );
    for kind in ScenarioKind::ALL {
        if let Some(s) = set.scenario(kind) {
            let _ = write!(
                body,
                " {}: cumulative net profit {}, final-month revenue {}.",
                kind,
                s.summary.total_net_profit.round_dp(2),
                s.summary.final_revenue.round_dp(2)
            );
        }
    }
    if set.is_flagged() {
        body.push_str(" These figures rest on at least one undefined growth rate and should not be quoted as precise.");
    }
    CommentarySection {
        title: "Forecast".into(),
        body,
    }
}

fn validation(output: &PipelineOutput) -> CommentarySection {
    let mut issues: Vec<String> = Vec::new();
    if !output.rejected_rows.is_empty() {
        issues.push(format!("{} rows rejected at load", output.rejected_rows.len()));
    }
    if output.dropped_missing_revenue > 0 {
        issues.push(format!(
            "{} rows had no revenue",
            output.dropped_missing_revenue
        ));
    }
    if !output.zero_revenue_periods.is_empty() {
        issues.push(format!(
            "margin undefined for {}",
            output.zero_revenue_periods.join(", ")
        ));
    }
    for forecast in [&output.monthly_forecast, &output.quarterly_forecast] {
        for a in &forecast.historical_growth.anomalies {
            issues.push(format!(
                "{} {} growth undefined ({})",
                forecast.frequency, a.line_item, a.reason
            ));
        }
        for s in forecast.scenarios.iter().filter(|s| s.is_truncated()) {
            issues.push(format!(
                "{} {} forecast stops after {} of {} periods",
                forecast.frequency,
                s.scenario,
                s.points.len(),
                forecast.horizon
            ));
        }
    }

    let body = if issues.is_empty() {
        "No data quality issues found.".to_string()
    } else {
        format!("Review before relying on these results: {}.", issues.join("; "))
    };
    CommentarySection {
        title: "Validation".into(),
        body,
    }
}
