//! `rank` handler: correlate every agent ordering against the reference
//! order and write the rank table.

use super::reporter_for;
use crate::commands::RankArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::project::Project;
use cotejar::{save_ranked, AgentId, RankAggregator, SortedDataset, WorkItem};
use tracing::warn;

/// Compute Spearman rho and p for every agent row against the reference
/// order in its file's header, then write `data/rank/rank.csv`.
///
/// # Errors
///
/// Fails on unknown agents, unreadable files, or write failures.
/// Malformed rows and failing pairs are reported and skipped.
pub fn run_rank(config: &CliConfig, args: &RankArgs) -> CliResult<()> {
    let project = Project::new(&config.root);
    let agent_files = selected_agent_files(&project, &args.agents)?;
    let reporter = reporter_for(config);

    let mut items = Vec::new();
    for (agent, path) in &agent_files {
        let parsed = SortedDataset::load(path)?;
        for error in &parsed.malformed {
            reporter.warning(&format!("{}: {error}", path.display()));
        }
        let reference = match parsed.dataset.reference_levels() {
            Ok(reference) => reference,
            Err(error) => {
                warn!(agent = %agent, path = %path.display(), %error, "unusable reference order");
                reporter.warning(&format!("{}: {error}", path.display()));
                continue;
            }
        };
        for row in parsed.dataset.rows() {
            if !args.categories.is_empty() && !args.categories.contains(&row.key.category) {
                continue;
            }
            if !args.transformations.is_empty()
                && !args.transformations.contains(&row.key.transformation)
            {
                continue;
            }
            let candidate = match row.levels() {
                Ok(candidate) => candidate,
                Err(error) => {
                    reporter.warning(&format!("{}: {}: {error}", path.display(), row.key));
                    continue;
                }
            };
            items.push(WorkItem {
                agent: agent.clone(),
                key: row.key.clone(),
                reference: reference.clone(),
                candidate,
            });
        }
    }

    let aggregator = if args.threads == 0 {
        RankAggregator::new()
    } else {
        RankAggregator::with_threads(args.threads)
    };
    let outcome = aggregator.rank_all(&items);
    for skipped in &outcome.skipped {
        reporter.warning(&format!(
            "skipped {} {}: {}",
            skipped.agent, skipped.key, skipped.reason
        ));
    }

    let path = project.ranked_file();
    save_ranked(&outcome.dataset, &path)?;
    reporter.success(&format!(
        "ranked {} pairs ({} skipped), data written to {}",
        outcome.dataset.len(),
        outcome.skipped.len(),
        path.display()
    ));
    Ok(())
}

/// Agents with data files, narrowed to the requested agent names.
fn selected_agent_files(
    project: &Project,
    requested: &[String],
) -> CliResult<Vec<(AgentId, std::path::PathBuf)>> {
    let available = project.agent_files()?;
    if requested.is_empty() {
        return Ok(available);
    }
    let mut selected = Vec::new();
    for name in requested {
        let agent: AgentId = name
            .parse()
            .map_err(|error: cotejar::CotejarError| CliError::invalid_argument(error.to_string()))?;
        match available.iter().find(|(a, _)| a == &agent) {
            Some(found) => selected.push(found.clone()),
            None => {
                return Err(CliError::invalid_argument(format!(
                    "no sorted data for agent '{name}'"
                )))
            }
        }
    }
    Ok(selected)
}
