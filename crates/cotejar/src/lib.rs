//! Cotejar: rank-agreement benchmarking for image similarity metrics
//!
//! Cotejar (Spanish: "to collate/compare") measures how well computational
//! image-similarity metrics agree with human perception. Baseline images
//! are degraded at increasing levels, metrics and blinded human raters
//! sort the degraded copies by similarity to the original, and the two
//! orderings are compared with Spearman rank correlation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     COTEJAR Pipeline                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐  │
//! │  │ Transform │   │  Metric   │   │ Sequencer │   │   Rank    │  │
//! │  │ Registry  │──►│ Registry  │──►│ + Symbols │──►│ Aggregator│  │
//! │  │ (levels)  │   │ (scores)  │   │ (orders)  │   │ (rho, p)  │  │
//! │  └───────────┘   └───────────┘   └───────────┘   └───────────┘  │
//! │        │                               │               │        │
//! │        ▼                               ▼               ▼        │
//! │   level images                   sorted CSVs       rank CSV     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod aggregate;
mod dataset;
mod level;
mod metric;
mod pixel;
mod result;
mod rng;
mod sequencer;
mod spearman;
mod transform;

pub use aggregate::{
    CorrelationRecord, RankAggregator, RankOutcome, RankedDataset, SkippedPair, WorkItem,
};
pub use dataset::{
    is_valid_name, ranked_to_csv, save_ranked, ParsedSorted, SortedDataset, SortedRow,
};
pub use level::{
    standard_order, AgentId, Level, PairKey, AGENT_DELIM, LEVEL_COUNT, MAX_LEVEL, SUBFIELD_DELIM,
};
pub use metric::{Analyzer, MetricRegistry, MseMetric, Polarity, PsnrMetric, SsimMetric};
pub use pixel::{PixelImage, Rgb};
pub use result::{CotejarError, CotejarResult};
pub use rng::Xorshift64;
pub use sequencer::{
    order_by_score, order_for_polarity, score_levels, SymbolEntry, SymbolStore,
};
pub use spearman::{correlate_orders, correlate_ranks, rank_scores, SpearmanResult};
pub use transform::{HueTransform, NoiseTransform, TransformRegistry, Transformer, ZoomTransform};
