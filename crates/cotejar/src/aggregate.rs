//! Rank aggregation: Spearman-correlate every agent's ordering against its
//! reference and collect the results into a ranked dataset.
//!
//! Work items are independent, so a batch is split across a scoped worker
//! pool. A failing pair is recorded and logged, never fatal to the batch.

use crate::level::{AgentId, Level, PairKey};
use crate::spearman::correlate_orders;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// One agent ordering to correlate against its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Who produced the candidate ordering
    pub agent: AgentId,
    /// The (category, transformation) pair being ranked
    pub key: PairKey,
    /// The canonical most-to-least-similar order
    pub reference: Vec<Level>,
    /// The agent's claimed order
    pub candidate: Vec<Level>,
}

/// A correlation result for one (agent, pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    /// The agent whose ordering was scored
    pub agent: AgentId,
    /// The pair the ordering covers
    pub key: PairKey,
    /// Spearman rank correlation coefficient
    pub coefficient: f64,
    /// Two-sided significance of the coefficient
    pub p_value: f64,
}

/// A pair dropped from a batch, with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPair {
    /// The agent whose item failed
    pub agent: AgentId,
    /// The pair that was being ranked
    pub key: PairKey,
    /// Human-readable failure reason
    pub reason: String,
}

/// Correlation records keyed by `(agent, pair)`. Inserting a key again
/// replaces the earlier record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedDataset {
    records: BTreeMap<(AgentId, PairKey), CorrelationRecord>,
}

impl RankedDataset {
    /// Empty dataset
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any earlier record for the same key
    pub fn upsert(&mut self, record: CorrelationRecord) {
        self.records
            .insert((record.agent.clone(), record.key.clone()), record);
    }

    /// Look up the record for an (agent, pair)
    #[must_use]
    pub fn get(&self, agent: &AgentId, key: &PairKey) -> Option<&CorrelationRecord> {
        self.records.get(&(agent.clone(), key.clone()))
    }

    /// Records in (agent, pair) order
    pub fn records(&self) -> impl Iterator<Item = &CorrelationRecord> {
        self.records.values()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The outcome of a batch: what succeeded and what was dropped.
#[derive(Debug, Default)]
pub struct RankOutcome {
    /// Successfully correlated pairs
    pub dataset: RankedDataset,
    /// Pairs dropped with their reasons, in (agent, pair) order
    pub skipped: Vec<SkippedPair>,
}

/// Batch Spearman evaluator with a configurable worker count.
#[derive(Debug, Clone, Copy)]
pub struct RankAggregator {
    threads: usize,
}

impl Default for RankAggregator {
    fn default() -> Self {
        Self { threads: 0 }
    }
}

impl RankAggregator {
    /// Aggregator sized to the machine (thread count 0 = auto)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed worker count; 1 runs the batch sequentially
    #[must_use]
    pub fn with_threads(threads: usize) -> Self {
        Self { threads }
    }

    /// Effective worker count
    #[must_use]
    pub fn thread_count(&self) -> usize {
        if self.threads == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.threads
        }
    }

    /// Correlate every work item, collecting successes into a dataset and
    /// failures into the skip list. Individual failures never abort the
    /// batch.
    #[must_use]
    pub fn rank_all(&self, items: &[WorkItem]) -> RankOutcome {
        let threads = self.thread_count().min(items.len().max(1));
        let evaluations = if threads <= 1 {
            items.iter().map(evaluate).collect()
        } else {
            evaluate_parallel(items, threads)
        };

        let mut outcome = RankOutcome::default();
        for evaluation in evaluations {
            match evaluation {
                Ok(record) => {
                    debug!(
                        agent = %record.agent,
                        key = %record.key,
                        rho = record.coefficient,
                        p = record.p_value,
                        "pair ranked"
                    );
                    outcome.dataset.upsert(record);
                }
                Err(skipped) => {
                    warn!(
                        agent = %skipped.agent,
                        key = %skipped.key,
                        reason = %skipped.reason,
                        "pair skipped"
                    );
                    outcome.skipped.push(skipped);
                }
            }
        }
        // worker completion order is nondeterministic
        outcome
            .skipped
            .sort_by(|a, b| (&a.agent, &a.key).cmp(&(&b.agent, &b.key)));
        outcome
    }
}

fn evaluate(item: &WorkItem) -> Result<CorrelationRecord, SkippedPair> {
    match correlate_orders(&item.reference, &item.candidate) {
        Ok(result) => Ok(CorrelationRecord {
            agent: item.agent.clone(),
            key: item.key.clone(),
            coefficient: result.rho,
            p_value: result.p_value,
        }),
        Err(error) => Err(SkippedPair {
            agent: item.agent.clone(),
            key: item.key.clone(),
            reason: error.to_string(),
        }),
    }
}

fn evaluate_parallel(
    items: &[WorkItem],
    threads: usize,
) -> Vec<Result<CorrelationRecord, SkippedPair>> {
    let chunk_size = items.len().div_ceil(threads);
    let collected = Mutex::new(Vec::with_capacity(items.len()));
    std::thread::scope(|scope| {
        for chunk in items.chunks(chunk_size) {
            let collected = &collected;
            scope.spawn(move || {
                let evaluations: Vec<_> = chunk.iter().map(evaluate).collect();
                collected
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .extend(evaluations);
            });
        }
    });
    collected
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::standard_order;

    fn levels(values: &[u32]) -> Vec<Level> {
        values.iter().map(|&v| Level::new(v).unwrap()).collect()
    }

    fn item(agent: AgentId, category: &str, candidate: Vec<Level>) -> WorkItem {
        WorkItem {
            agent,
            key: PairKey::new(category, "noise"),
            reference: standard_order(11),
            candidate,
        }
    }

    #[test]
    fn test_perfect_agreement_batch() {
        let items = vec![item(
            AgentId::metric("mse"),
            "cat",
            standard_order(11),
        )];
        let outcome = RankAggregator::with_threads(1).rank_all(&items);
        assert!(outcome.skipped.is_empty());
        let record = outcome
            .dataset
            .get(&AgentId::metric("mse"), &PairKey::new("cat", "noise"))
            .unwrap();
        assert!((record.coefficient - 1.0).abs() < 1e-12);
        assert!(record.p_value.abs() < 1e-12);
    }

    #[test]
    fn test_malformed_pair_is_skipped_not_fatal() {
        // three pairs, one with a duplicated level: two records, one skip
        let items = vec![
            item(AgentId::metric("mse"), "cat_a", standard_order(11)),
            item(
                AgentId::metric("mse"),
                "cat_b",
                levels(&[0, 0, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            ),
            item(AgentId::human("p01"), "cat_a", {
                let mut reversed = standard_order(11);
                reversed.reverse();
                reversed
            }),
        ];
        let outcome = RankAggregator::with_threads(1).rank_all(&items);
        assert_eq!(outcome.dataset.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].key, PairKey::new("cat_b", "noise"));
        assert!(outcome.skipped[0].reason.contains("duplicate"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let items: Vec<WorkItem> = (0..20)
            .map(|i| {
                let mut candidate = standard_order(11);
                candidate.swap(i % 10, i % 10 + 1);
                item(AgentId::human(format!("p{i:02}")), "cat", candidate)
            })
            .collect();
        let sequential = RankAggregator::with_threads(1).rank_all(&items);
        let parallel = RankAggregator::with_threads(4).rank_all(&items);
        assert_eq!(sequential.dataset, parallel.dataset);
        assert_eq!(sequential.skipped, parallel.skipped);
    }

    #[test]
    fn test_upsert_replaces_existing_record() {
        let mut dataset = RankedDataset::new();
        let agent = AgentId::metric("mse");
        let key = PairKey::new("cat", "noise");
        dataset.upsert(CorrelationRecord {
            agent: agent.clone(),
            key: key.clone(),
            coefficient: 0.5,
            p_value: 0.2,
        });
        dataset.upsert(CorrelationRecord {
            agent: agent.clone(),
            key: key.clone(),
            coefficient: 0.9,
            p_value: 0.01,
        });
        assert_eq!(dataset.len(), 1);
        assert!((dataset.get(&agent, &key).unwrap().coefficient - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_records_iterate_in_key_order() {
        let mut dataset = RankedDataset::new();
        for name in ["zzz", "aaa", "mmm"] {
            dataset.upsert(CorrelationRecord {
                agent: AgentId::metric(name),
                key: PairKey::new("cat", "noise"),
                coefficient: 1.0,
                p_value: 0.0,
            });
        }
        let names: Vec<String> = dataset.records().map(|r| r.agent.name().to_string()).collect();
        assert_eq!(names, vec!["aaa", "mmm", "zzz"]);
    }

    #[test]
    fn test_empty_batch() {
        let outcome = RankAggregator::new().rank_all(&[]);
        assert!(outcome.dataset.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_auto_thread_count_is_positive() {
        assert!(RankAggregator::new().thread_count() >= 1);
    }
}
