//! qualdash core library - issue aggregation and cross-version metric diffing
//! for the quality dashboard

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Every request recomputes from the files on disk; nothing is cached
// - No global mutable state; accumulators are threaded by the caller
// - No randomness, clocks, threads, or async
// - Deterministic output ordering must be explicit
// - Identical input yields byte-for-byte identical output

pub mod config;
pub mod dashboard;
pub mod error;
pub mod git;
pub mod issues;
pub mod metrics_tree;
pub mod statistics;
pub mod store;
pub mod tags;
pub mod version_diff;

pub use config::ResolvedConfig;
pub use dashboard::Dashboard;
pub use error::{EngineError, EngineResult};
pub use issues::{bucketize_issues, Bucketized, Issue, LineIssueBucket};
pub use metrics_tree::{paired_maxima, reduce_maxima, MetricMaxima, MetricNode};
pub use statistics::{summarize_statistics, StatisticsSeries};
pub use store::DataStore;
pub use tags::{normalize_tags, TagComparison, TagEntry};
pub use version_diff::{extract_version_diff, VersionDiffRecord, VersionOrder};

/// Render any response as pretty JSON (deterministic: struct field order and
/// the source key order of pass-through objects)
pub fn render_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    use anyhow::Context;
    serde_json::to_string_pretty(value).context("failed to serialize response to JSON")
}
