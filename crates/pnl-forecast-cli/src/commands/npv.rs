use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

use pnl_forecast_core::pipeline::value_cash_flows;

use crate::input;

/// Arguments for NPV of an arbitrary cash-flow sequence
#[derive(Args)]
pub struct NpvArgs {
    /// Comma-separated cash flows, first flow discounted one period
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Per-period discount rate
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,

    /// JSON file: an array of cash flows or {"cash_flows": [...], "rate": ...}
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NpvFile {
    Flows(Vec<Decimal>),
    Full {
        cash_flows: Vec<Decimal>,
        rate: Option<Decimal>,
    },
}

impl NpvFile {
    fn into_parts(self) -> (Vec<Decimal>, Option<Decimal>) {
        match self {
            NpvFile::Flows(flows) => (flows, None),
            NpvFile::Full { cash_flows, rate } => (cash_flows, rate),
        }
    }
}

pub fn run_npv(args: NpvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (flows, file_rate) = if let Some(flows) = args.cash_flows {
        (flows, None)
    } else if let Some(ref path) = args.input {
        let file: NpvFile = serde_json::from_value(input::file::read_json_value(path)?)?;
        file.into_parts()
    } else if let Some(text) = input::stdin::read_stdin()? {
        let file: NpvFile = serde_json::from_str(&text)?;
        file.into_parts()
    } else {
        return Err("--cash-flows, --input <file.json> or stdin required for npv".into());
    };

    let rate = args.rate.or(file_rate).unwrap_or(dec!(0.06));
    let result = value_cash_flows(&flows, rate)?;
    Ok(serde_json::to_value(result)?)
}
