use clap::Args;
use rust_decimal::Decimal;

use pnl_forecast_core::{PipelineConfig, PipelineInput};

use crate::input;

/// Flags shared by every subcommand that runs the pipeline.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Monthly P&L data (.csv, or .json row array / {rows, config}); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Pipeline configuration file (.yaml/.yml or .json)
    #[arg(long)]
    pub config: Option<String>,

    /// Per-period discount rate (0.06 = 6%)
    #[arg(long, allow_hyphen_values = true)]
    pub discount_rate: Option<Decimal>,

    /// Monthly forecast horizon in months
    #[arg(long)]
    pub months: Option<u32>,

    /// Quarterly forecast horizon in quarters
    #[arg(long)]
    pub quarters: Option<u32>,
}

impl PipelineArgs {
    /// Resolve rows and configuration. Precedence, lowest first: config
    /// embedded in the input, `--config` file, individual flags.
    pub fn resolve(&self) -> Result<PipelineInput, Box<dyn std::error::Error>> {
        let mut pipeline_input = if let Some(ref path) = self.input {
            input::file::read_pipeline_input(path)?
        } else if let Some(data) = input::stdin::read_pipeline_stdin()? {
            data
        } else {
            return Err("--input <file> or piped stdin data required".into());
        };

        if let Some(ref path) = self.config {
            pipeline_input.config = input::file::read_structured::<PipelineConfig>(path)?;
        }
        self.apply_overrides(&mut pipeline_input.config);
        pipeline_input.config.validate()?;

        tracing::debug!(
            rows = pipeline_input.rows.len(),
            discount_rate = %pipeline_input.config.discount_rate,
            "input resolved"
        );
        Ok(pipeline_input)
    }

    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(rate) = self.discount_rate {
            config.discount_rate = rate;
        }
        if let Some(months) = self.months {
            config.monthly_horizon = months;
        }
        if let Some(quarters) = self.quarters {
            config.quarterly_horizon = quarters;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_override_config() {
        let args = PipelineArgs {
            discount_rate: Some(dec!(0.1)),
            months: Some(12),
            ..Default::default()
        };
        let mut config = PipelineConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.discount_rate, dec!(0.1));
        assert_eq!(config.monthly_horizon, 12);
        assert_eq!(config.quarterly_horizon, 20);
    }
}
