//! `clean` handler: remove generated level images and metric sorted data.

use super::{reporter_for, select};
use crate::commands::CleanArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::project::Project;
use cotejar::TransformRegistry;
use std::path::Path;
use tracing::debug;

/// Remove the level-image directories for the selected pairs and the
/// metric sorted data directory. Baselines, human data, raw data, and the
/// symbol map are never touched. With `--dry-run` nothing is removed, the
/// paths are only reported.
///
/// # Errors
///
/// Fails on unknown names or when a directory cannot be removed.
pub fn run_clean(config: &CliConfig, args: &CleanArgs) -> CliResult<()> {
    let project = Project::new(&config.root);
    let categories = select(&args.categories, project.categories()?, "category")?;
    let transformations = select(
        &args.transformations,
        TransformRegistry::with_builtins().names(),
        "transformation",
    )?;

    let mut reporter = reporter_for(config);
    let mut removed = 0_usize;
    for category in &categories {
        for transformation in &transformations {
            let dir = project.level_dir(category, transformation);
            if remove_dir(&dir, args.dry_run, &mut reporter)? {
                removed += 1;
            }
        }
    }
    // filtered runs leave the shared metric data alone, one stale pair
    // would otherwise drop every other pair's rows
    let unfiltered = args.categories.is_empty() && args.transformations.is_empty();
    if unfiltered && remove_dir(&project.metric_sorted_dir(), args.dry_run, &mut reporter)? {
        removed += 1;
    }

    if args.dry_run {
        reporter.success(&format!("dry run, {removed} directories would be removed"));
    } else {
        reporter.success(&format!("removed {removed} directories"));
    }
    Ok(())
}

fn remove_dir(
    dir: &Path,
    dry_run: bool,
    reporter: &mut crate::output::ProgressReporter,
) -> CliResult<bool> {
    if !dir.is_dir() {
        debug!(path = %dir.display(), "nothing to remove");
        return Ok(false);
    }
    if dry_run {
        reporter.info(&format!("would remove {}", dir.display()));
    } else {
        std::fs::remove_dir_all(dir)?;
        reporter.info(&format!("removed {}", dir.display()));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, ColorChoice, Verbosity};
    use cotejar::{Level, PixelImage, Rgb};
    use tempfile::TempDir;

    fn seeded_project(root: &std::path::Path) -> Project {
        let project = Project::new(root);
        let baseline = PixelImage::filled(4, 4, Rgb::new(120, 60, 30));
        crate::project::write_image(&baseline, &root.join("images/cat/orig.png")).unwrap();
        project
            .write_level_image("cat", "noise", Level::baseline(), &baseline)
            .unwrap();
        std::fs::create_dir_all(project.metric_sorted_dir()).unwrap();
        std::fs::write(project.metric_sorted_dir().join("mse.csv"), "stub").unwrap();
        project
    }

    fn config(root: &std::path::Path) -> CliConfig {
        CliConfig::new()
            .with_verbosity(Verbosity::Quiet)
            .with_color(ColorChoice::Never)
            .with_root(root.to_path_buf())
    }

    #[test]
    fn test_clean_removes_levels_and_sorted_data() {
        let dir = TempDir::new().unwrap();
        let project = seeded_project(dir.path());
        let args = CleanArgs {
            categories: vec![],
            transformations: vec![],
            dry_run: false,
        };
        run_clean(&config(dir.path()), &args).unwrap();
        assert!(!project.level_dir("cat", "noise").exists());
        assert!(!project.metric_sorted_dir().exists());
        assert!(project.orig_path("cat").is_some());
    }

    #[test]
    fn test_dry_run_removes_nothing() {
        let dir = TempDir::new().unwrap();
        let project = seeded_project(dir.path());
        let args = CleanArgs {
            categories: vec![],
            transformations: vec![],
            dry_run: true,
        };
        run_clean(&config(dir.path()), &args).unwrap();
        assert!(project.level_dir("cat", "noise").is_dir());
        assert!(project.metric_sorted_dir().is_dir());
    }

    #[test]
    fn test_filtered_clean_keeps_sorted_data() {
        let dir = TempDir::new().unwrap();
        let project = seeded_project(dir.path());
        let args = CleanArgs {
            categories: vec![],
            transformations: vec!["noise".to_string()],
            dry_run: false,
        };
        run_clean(&config(dir.path()), &args).unwrap();
        assert!(!project.level_dir("cat", "noise").exists());
        assert!(project.metric_sorted_dir().is_dir());
    }
}
