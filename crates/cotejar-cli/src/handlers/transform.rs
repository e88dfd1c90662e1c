//! `transform` handler: write distorted level images for every selected
//! (category, transformation) pair.

use super::{reporter_for, select};
use crate::commands::TransformArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::project::Project;
use cotejar::{Level, TransformRegistry, LEVEL_COUNT};
use tracing::debug;

/// Apply each selected transformation at levels 0..=10 to each selected
/// category's baseline.
///
/// # Errors
///
/// Fails on unknown names, unreadable baselines, or write failures.
/// Existing level images are skipped unless overwrite is set.
pub fn run_transform(config: &CliConfig, args: &TransformArgs) -> CliResult<()> {
    let project = Project::new(&config.root);
    let registry = TransformRegistry::with_builtins();
    let categories = select(&args.categories, project.categories()?, "category")?;
    let transformations = select(&args.transformations, registry.names(), "transformation")?;

    let mut reporter = reporter_for(config);
    let total = (categories.len() * transformations.len() * LEVEL_COUNT) as u64;
    reporter.start_progress(total, "transforming");

    let mut written = 0_usize;
    for category in &categories {
        let orig = project.read_orig(category)?;
        for transformation in &transformations {
            let transformer = registry.lookup(transformation)?;
            reporter.set_message(&format!("{category}/{transformation}"));
            for level in Level::full_range() {
                let path = project.level_path(category, transformation, level);
                if path.is_file() && !args.overwrite {
                    debug!(path = %path.display(), "level image exists, skipping");
                    reporter.increment(1);
                    continue;
                }
                let out = transformer.apply(&orig, level)?;
                project.write_level_image(category, transformation, level, &out)?;
                written += 1;
                reporter.increment(1);
            }
        }
    }
    reporter.finish();
    reporter.success(&format!(
        "wrote {written} level images for {} categories x {} transformations",
        categories.len(),
        transformations.len()
    ));
    Ok(())
}
