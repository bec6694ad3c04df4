use clap::{Args, ValueEnum};
use serde_json::Value;

use pnl_forecast_core::narrative::{generate_commentary, RuleBasedCommentator};
use pnl_forecast_core::pipeline::{self, run_pipeline};
use pnl_forecast_core::Frequency;

use crate::config::PipelineArgs;

/// Arguments for the full pipeline run
#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for loading and deriving monthly records
#[derive(Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for quarterly aggregation
#[derive(Args)]
pub struct QuartersArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for the scenario forecast
#[derive(Args)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Projection granularity
    #[arg(long, default_value = "monthly")]
    pub frequency: FrequencyArg,

    /// Number of periods to project (overrides --months / --quarters)
    #[arg(long)]
    pub horizon: Option<u32>,
}

/// Arguments for narrative commentary
#[derive(Args)]
pub struct CommentaryArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Monthly,
    Quarterly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Monthly => Frequency::Monthly,
            FrequencyArg::Quarterly => Frequency::Quarterly,
        }
    }
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = args.pipeline.resolve()?;
    let result = run_pipeline(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_load(args: LoadArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = args.pipeline.resolve()?;
    let result = pipeline::run_records(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_quarters(args: QuartersArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = args.pipeline.resolve()?;
    let result = pipeline::run_quarters(&input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_forecast(args: ForecastArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input = args.pipeline.resolve()?;
    let frequency = Frequency::from(args.frequency);
    if let Some(horizon) = args.horizon {
        match frequency {
            Frequency::Monthly => input.config.monthly_horizon = horizon,
            Frequency::Quarterly => input.config.quarterly_horizon = horizon,
        }
    }
    let result = pipeline::run_forecast(&input, frequency)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_commentary(args: CommentaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = args.pipeline.resolve()?;
    let output = run_pipeline(&input)?;
    let mut result = generate_commentary(&RuleBasedCommentator, &output.result)?;
    // pipeline warnings are what the commentary is about; keep them visible
    result.warnings.extend(output.warnings);
    Ok(serde_json::to_value(result)?)
}
