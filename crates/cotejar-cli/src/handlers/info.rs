//! `info` handler: list what the project and registries offer.

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::project::Project;
use console::style;
use cotejar::{MetricRegistry, TransformRegistry};

/// Print discovered categories and registered transformations and metrics.
///
/// # Errors
///
/// Fails when the project's images directory cannot be read.
pub fn run_info(config: &CliConfig) -> CliResult<()> {
    let color = config.color.should_color();
    let heading = |text: &str| {
        if color {
            println!("{}", style(text).bold());
        } else {
            println!("{text}");
        }
    };

    heading("Categories:");
    for category in project_categories(config) {
        println!("  {category}");
    }
    heading("Transformations:");
    for name in TransformRegistry::with_builtins().names() {
        println!("  {name}");
    }
    heading("Metrics:");
    for name in MetricRegistry::with_builtins().names() {
        println!("  {name}");
    }
    Ok(())
}

/// Categories, or none when the project has no images directory yet.
fn project_categories(config: &CliConfig) -> Vec<String> {
    Project::new(&config.root).categories().unwrap_or_default()
}
