//! Cotejador: command-line driver for the Cotejar benchmark
//!
//! ## Usage
//!
//! ```bash
//! cotejador info                      # List categories, transformations, metrics
//! cotejador transform -t noise        # Write distorted level images
//! cotejador sort -m mse -m ssim       # Score level images, write sorted CSVs
//! cotejador rank                      # Correlate agents, write rank.csv
//! cotejador sequence red_carpet noise # Print the blind symbol sequence
//! cotejador decode                    # Decode raw symbol data
//! cotejador clean --dry-run           # Preview removal of generated data
//! ```

use clap::Parser;
use cotejador::{
    handlers::{
        clean::run_clean, decode::run_decode, info::run_info, rank::run_rank,
        sequence::run_sequence, sort::run_sort, transform::run_transform,
    },
    Cli, CliConfig, CliResult, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    cotejador::init_tracing(&config);

    match cli.command {
        Commands::Info => run_info(&config),
        Commands::Transform(args) => run_transform(&config, &args),
        Commands::Sort(args) => run_sort(&config, &args),
        Commands::Rank(args) => run_rank(&config, &args),
        Commands::Decode(args) => run_decode(&config, &args),
        Commands::Sequence(args) => run_sequence(&config, &args),
        Commands::Clean(args) => run_clean(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(cli.color.into())
        .with_root(cli.root.clone())
}
