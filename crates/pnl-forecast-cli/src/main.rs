mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::npv::NpvArgs;
use commands::pipeline::{AnalyzeArgs, CommentaryArgs, ForecastArgs, LoadArgs, QuartersArgs};

/// Monthly P&L analysis, NPV and scenario forecasting
#[derive(Parser)]
#[command(
    name = "pnl",
    version,
    about = "Monthly P&L analysis, NPV and scenario forecasting",
    long_about = "Loads monthly profit-and-loss data, derives net profit after tax and \
                  margins, aggregates calendar quarters, discounts net profit to present \
                  value and projects conservative/moderate/optimistic scenarios with \
                  decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: records, quarters, NPV, forecasts
    Analyze(AnalyzeArgs),
    /// Load and validate monthly records
    Load(LoadArgs),
    /// Aggregate monthly records into calendar quarters
    Quarters(QuartersArgs),
    /// Project scenario forecasts from historical growth
    Forecast(ForecastArgs),
    /// Net present value of a cash-flow sequence
    Npv(NpvArgs),
    /// Narrative commentary on the pipeline results
    Commentary(CommentaryArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::pipeline::run_analyze(args),
        Commands::Load(args) => commands::pipeline::run_load(args),
        Commands::Quarters(args) => commands::pipeline::run_quarters(args),
        Commands::Forecast(args) => commands::pipeline::run_forecast(args),
        Commands::Npv(args) => commands::npv::run_npv(args),
        Commands::Commentary(args) => commands::pipeline::run_commentary(args),
        Commands::Version => {
            println!("pnl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
