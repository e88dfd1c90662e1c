//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Cotejador: CLI for Cotejar - rank-agreement benchmarking for image
/// similarity metrics
#[derive(Parser, Debug)]
#[command(name = "cotejador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Project root directory
    #[arg(long, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List discovered categories and registered transformations and metrics
    Info,

    /// Apply transformations to the baseline images at every level
    Transform(TransformArgs),

    /// Score level images with each metric and write sorted datasets
    Sort(SortArgs),

    /// Correlate agent orderings against the reference and write the rank table
    Rank(RankArgs),

    /// Decode raw symbol datasets into human-readable sorted data
    Decode(DecodeArgs),

    /// Generate (or reprint) the blind symbol sequence for a pair
    Sequence(SequenceArgs),

    /// Remove generated level images and metric sorted data
    Clean(CleanArgs),
}

/// Arguments for the transform command
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// Categories to transform (default: all discovered)
    #[arg(short, long = "category")]
    pub categories: Vec<String>,

    /// Transformations to apply (default: all registered)
    #[arg(short, long = "transformation")]
    pub transformations: Vec<String>,

    /// Overwrite existing level images
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub overwrite: bool,
}

/// Arguments for the sort command
#[derive(Parser, Debug)]
pub struct SortArgs {
    /// Categories to score (default: all discovered)
    #[arg(short, long = "category")]
    pub categories: Vec<String>,

    /// Transformations to score (default: all registered)
    #[arg(short, long = "transformation")]
    pub transformations: Vec<String>,

    /// Metrics to score with (default: all registered)
    #[arg(short, long = "metric")]
    pub metrics: Vec<String>,

    /// Overwrite existing sorted files
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub overwrite: bool,
}

/// Arguments for the rank command
#[derive(Parser, Debug)]
pub struct RankArgs {
    /// Agents to rank, e.g. "metrics-mse" or "humans-p01" (default: all with data)
    #[arg(short, long = "agent")]
    pub agents: Vec<String>,

    /// Categories to include (default: all in the data)
    #[arg(short, long = "category")]
    pub categories: Vec<String>,

    /// Transformations to include (default: all in the data)
    #[arg(short, long = "transformation")]
    pub transformations: Vec<String>,

    /// Number of worker threads (0 = auto)
    #[arg(short = 'j', long, default_value = "0")]
    pub threads: usize,
}

/// Arguments for the decode command
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// Raw file names under data/sort/raw to decode (default: all)
    #[arg(short, long = "file")]
    pub files: Vec<String>,
}

/// Arguments for the sequence command
#[derive(Parser, Debug)]
pub struct SequenceArgs {
    /// Category of the pair
    pub category: String,

    /// Transformation of the pair
    pub transformation: String,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Categories whose level images to remove (default: all discovered)
    #[arg(short, long = "category")]
    pub categories: Vec<String>,

    /// Transformations whose level images to remove (default: all registered)
    #[arg(short, long = "transformation")]
    pub transformations: Vec<String>,

    /// Report what would be removed without removing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Color output argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
