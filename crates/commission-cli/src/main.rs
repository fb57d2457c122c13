mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::calculate::{CalculateArgs, EvaluateArgs, StackArgs};

/// Commission calculations with decimal precision
#[derive(Parser)]
#[command(
    name = "comm",
    version,
    about = "Commission calculations with decimal precision",
    long_about = "A CLI for running commission calculations with decimal precision. \
                  Supports precedence-based rule selection, rule stacking, tiered \
                  rate schedules, and single-rule evaluation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: basis resolution, sale-amount filtering,
    /// precedence selection
    Calculate(CalculateArgs),
    /// Stack every supplied rule with no precedence filtering
    Stack(StackArgs),
    /// Evaluate a single rule against a basis amount
    Evaluate(EvaluateArgs),
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

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::calculate::run_calculate(args),
        Commands::Stack(args) => commands::calculate::run_stack(args),
        Commands::Evaluate(args) => commands::calculate::run_evaluate(args),
        Commands::Version => {
            println!("comm {}", env!("CARGO_PKG_VERSION"));
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
