use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use pnl_forecast_core::narrative::{generate_commentary, RuleBasedCommentator};
use pnl_forecast_core::pipeline::{self, PipelineInput};
use pnl_forecast_core::Frequency;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_input(input_json: &str) -> NapiResult<PipelineInput> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[napi]
pub fn run_pipeline(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = pipeline::run_pipeline(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn load_records(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = pipeline::run_records(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn aggregate_quarters(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = pipeline::run_quarters(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ForecastRequest {
    #[serde(flatten)]
    input: PipelineInput,
    #[serde(default = "default_frequency")]
    frequency: Frequency,
}

fn default_frequency() -> Frequency {
    Frequency::Monthly
}

#[napi]
pub fn forecast(input_json: String) -> NapiResult<String> {
    let request: ForecastRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        pipeline::run_forecast(&request.input, request.frequency).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Present value
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct NpvRequest {
    cash_flows: Vec<Decimal>,
    rate: Decimal,
}

#[napi]
pub fn calculate_npv(input_json: String) -> NapiResult<String> {
    let request: NpvRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        pipeline::value_cash_flows(&request.cash_flows, request.rate).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Commentary
// ---------------------------------------------------------------------------

#[napi]
pub fn commentary(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = pipeline::run_pipeline(&input).map_err(to_napi_error)?;
    let mut result =
        generate_commentary(&RuleBasedCommentator, &output.result).map_err(to_napi_error)?;
    result.warnings.extend(output.warnings);
    serde_json::to_string(&result).map_err(to_napi_error)
}
