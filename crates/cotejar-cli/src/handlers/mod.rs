//! Subcommand handlers

pub mod clean;
pub mod decode;
pub mod info;
pub mod rank;
pub mod sequence;
pub mod sort;
pub mod transform;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;

/// Reporter configured from the CLI flags
#[must_use]
pub fn reporter_for(config: &CliConfig) -> ProgressReporter {
    ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
}

/// Narrow `available` to the requested names, or keep all of them when
/// nothing was requested. An unknown requested name is an argument error.
pub fn select(requested: &[String], available: Vec<String>, kind: &str) -> CliResult<Vec<String>> {
    if requested.is_empty() {
        return Ok(available);
    }
    for name in requested {
        if !available.contains(name) {
            return Err(CliError::invalid_argument(format!(
                "unknown {kind} '{name}' (available: {})",
                available.join(", ")
            )));
        }
    }
    Ok(requested.to_vec())
}
