//! `decode` handler: turn raw symbol datasets into level datasets using
//! the sequence map.

use super::reporter_for;
use crate::commands::DecodeArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::project::Project;
use cotejar::{SortedDataset, SymbolStore};

/// Decode each raw symbol CSV under `data/sort/raw/` through the sequence
/// map and write the level ordering to `data/sort/humans/`.
///
/// # Errors
///
/// Fails on unknown file names, unreadable files, or write failures.
/// Rows whose symbols cannot be decoded are reported and skipped.
pub fn run_decode(config: &CliConfig, args: &DecodeArgs) -> CliResult<()> {
    let project = Project::new(&config.root);
    let reporter = reporter_for(config);
    let store = SymbolStore::load(&project.sequence_map_file())?;

    let available = project.raw_files()?;
    let names = if args.files.is_empty() {
        available
    } else {
        for name in &args.files {
            if !available.contains(name) {
                return Err(CliError::invalid_argument(format!(
                    "no raw file '{name}' under {}",
                    project.raw_sorted_dir().display()
                )));
            }
        }
        args.files.clone()
    };

    for name in &names {
        let input_path = project.raw_sorted_dir().join(name);
        let parsed = SortedDataset::load(&input_path)?;
        for error in &parsed.malformed {
            reporter.warning(&format!("{}: {error}", input_path.display()));
        }

        let arity = parsed.dataset.reference().len();
        let mut decoded = SortedDataset::with_standard_reference(arity);
        let mut dropped = 0_usize;
        for row in parsed.dataset.rows() {
            let levels = row
                .symbols()
                .and_then(|symbols| store.decode(&row.key, &symbols));
            match levels {
                Ok(levels) => decoded.push_levels(row.key.clone(), &levels),
                Err(error) => {
                    dropped += 1;
                    reporter.warning(&format!("{}: {}: {error}", input_path.display(), row.key));
                }
            }
        }

        let output_path = project.human_sorted_dir().join(name);
        decoded.save(&output_path)?;
        reporter.success(&format!(
            "decoded {} rows ({dropped} dropped) into {}",
            decoded.rows().len(),
            output_path.display()
        ));
    }
    Ok(())
}
