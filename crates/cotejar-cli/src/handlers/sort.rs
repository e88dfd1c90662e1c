//! `sort` handler: score level images with each metric and write one
//! sorted dataset per metric.

use super::{reporter_for, select};
use crate::commands::SortArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::project::Project;
use cotejar::{
    order_for_polarity, score_levels, MetricRegistry, PairKey, SortedDataset, LEVEL_COUNT,
};
use tracing::{debug, warn};

/// Score every selected (category, transformation) pair with each selected
/// metric and write `data/sort/metrics/<metric>.csv`.
///
/// # Errors
///
/// Fails on unknown names, unreadable level images, metric contract
/// violations, or write failures. Categories with an unreadable baseline
/// and pairs without level images are skipped with a warning; existing
/// metric files are skipped unless overwrite is set.
pub fn run_sort(config: &CliConfig, args: &SortArgs) -> CliResult<()> {
    let project = Project::new(&config.root);
    let registry = MetricRegistry::with_builtins();
    let categories = select(&args.categories, project.categories()?, "category")?;
    let transformations = select(
        &args.transformations,
        cotejar::TransformRegistry::with_builtins().names(),
        "transformation",
    )?;
    let metrics = select(&args.metrics, registry.names(), "metric")?;

    let mut reporter = reporter_for(config);
    let total = (metrics.len() * categories.len() * transformations.len()) as u64;
    reporter.start_progress(total, "sorting");

    for metric in &metrics {
        let path = project.metric_sorted_dir().join(format!("{metric}.csv"));
        if path.is_file() && !args.overwrite {
            debug!(path = %path.display(), "sorted file exists, skipping");
            reporter.increment((categories.len() * transformations.len()) as u64);
            continue;
        }
        let analyzer = registry.lookup(metric)?;
        let mut dataset = SortedDataset::with_standard_reference(LEVEL_COUNT);
        for category in &categories {
            let orig = match project.read_orig(category) {
                Ok(image) => image,
                Err(err) => {
                    warn!(category, error = %err, "baseline unreadable, skipping category");
                    reporter.warning(&format!("skipping {category}: {err}"));
                    reporter.increment(transformations.len() as u64);
                    continue;
                }
            };
            for transformation in &transformations {
                reporter.set_message(&format!("{metric}: {category}/{transformation}"));
                let level_images = project.read_level_images(category, transformation)?;
                if level_images.is_empty() {
                    warn!(category, transformation, "no level images, skipping pair");
                    reporter.increment(1);
                    continue;
                }
                let scores = score_levels(analyzer, metric, &orig, &level_images)?;
                let order = order_for_polarity(&scores, analyzer.polarity());
                dataset.push_levels(PairKey::new(category, transformation), &order);
                reporter.increment(1);
            }
        }
        dataset.save(&path)?;
        reporter.info(&format!("data written to {}", path.display()));
    }
    reporter.finish();
    reporter.success(&format!("sorted with {} metrics", metrics.len()));
    Ok(())
}
