//! Cotejador CLI library
//!
//! Command-line interface for the Cotejar rank-agreement benchmark:
//! project discovery, image file I/O, and one handler per subcommand.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;
pub mod project;

pub use commands::{
    Cli, CleanArgs, ColorArg, Commands, DecodeArgs, RankArgs, SequenceArgs, SortArgs,
    TransformArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use project::{read_image, write_image, Project};

/// Initialise tracing output according to the configured verbosity.
/// `COTEJAR_LOG` overrides the verbosity-derived filter.
pub fn init_tracing(config: &CliConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("COTEJAR_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.verbosity.tracing_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color.should_color())
        .try_init();
}
