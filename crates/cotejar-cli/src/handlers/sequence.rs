//! `sequence` handler: generate or reprint the blind symbol sequence for
//! a (category, transformation) pair.

use crate::commands::SequenceArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::project::Project;
use cotejar::{is_valid_name, standard_order, PairKey, SymbolStore, LEVEL_COUNT};

/// Encode the pair's canonical order into symbols (idempotently) and
/// persist the sequence map. The symbol sequence is printed to stdout,
/// comma-separated, for use on a trial sheet.
///
/// # Errors
///
/// Fails on invalid pair names or sequence-map I/O failures.
pub fn run_sequence(config: &CliConfig, args: &SequenceArgs) -> CliResult<()> {
    if !is_valid_name(&args.category) || !is_valid_name(&args.transformation) {
        return Err(CliError::invalid_argument(format!(
            "'{}'/'{}' is not a usable pair name",
            args.category, args.transformation
        )));
    }
    let project = Project::new(&config.root);
    let map_path = project.sequence_map_file();
    let store = SymbolStore::load(&map_path)?;

    let key = PairKey::new(&args.category, &args.transformation);
    let symbols = store.encode(&key, &standard_order(LEVEL_COUNT))?;
    store.save(&map_path)?;

    let rendered: Vec<String> = symbols.iter().map(ToString::to_string).collect();
    println!("{}", rendered.join(","));
    Ok(())
}
