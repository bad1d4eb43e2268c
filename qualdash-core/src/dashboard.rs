//! Dashboard operations - one per view of the front-end
//!
//! Each operation reads what it needs from the data store, runs the matching
//! transform and returns the exact response shape the view consumes. Nothing
//! is kept between calls.

use crate::config::ResolvedConfig;
use crate::issues::{bucketize_issues, count_lines, LineIssueBucket};
use crate::metrics_tree::{paired_maxima, MetricMaxima, MetricNode};
use crate::statistics::{summarize_statistics, StatisticsSeries};
use crate::store::DataStore;
use crate::tags::{normalize_tags, TagComparison, TagEntry};
use crate::version_diff::{extract_version_diff, version_id_from_label, VersionDiffRecord};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// `[tree1, tree2, maxima]` for the paired radar view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedRadar(pub MetricNode, pub MetricNode, pub MetricMaxima);

/// `[source text, line buckets]` for the file view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIssues(pub String, pub LineIssueBucket);

/// Tag view payload: one version's raw list, or two aligned vectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagStats {
    Single(Vec<TagEntry>),
    Pair(TagComparison),
}

/// Data store plus the configuration the operations need
#[derive(Debug, Clone)]
pub struct Dashboard {
    store: DataStore,
    config: ResolvedConfig,
}

impl Dashboard {
    pub fn new(store: DataStore, config: ResolvedConfig) -> Self {
        Dashboard { store, config }
    }

    /// Dashboard over the configured data directory
    pub fn from_config(config: ResolvedConfig) -> Self {
        let store = DataStore::new(config.data_dir.clone());
        Dashboard::new(store, config)
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Overview data, as stored
    pub fn overview(&self) -> Result<String> {
        debug!("overview");
        self.store.load_overview()
    }

    pub fn radar_tree(&self, version: &str) -> Result<MetricNode> {
        debug!(version, "radar tree");
        self.store.load_metric_tree(version)
    }

    /// Both trees plus the union maxima that scales their shared axes
    pub fn paired_radar_trees(&self, v1: &str, v2: &str) -> Result<PairedRadar> {
        debug!(v1, v2, "paired radar trees");
        let first = self.store.load_metric_tree(v1)?;
        let second = self.store.load_metric_tree(v2)?;
        let maxima = paired_maxima(&first, &second);
        Ok(PairedRadar(first, second, maxima))
    }

    /// Source of one file and its issues filed by line
    ///
    /// Records that cannot be decoded or placed are logged and left out; the
    /// bucket still covers every line of the file.
    pub fn file_issues(&self, version: &str, file: &str) -> Result<FileIssues> {
        debug!(version, file, "file issues");
        let source = self.store.load_source(version, file)?;
        let dump = self.store.load_issue_dump(version)?;

        let (issues, decode_faults) = dump.decode();
        let bucketized = bucketize_issues(&issues, file, count_lines(&source));

        let skipped = decode_faults.len() + bucketized.faults.len();
        if skipped > 0 {
            warn!(version, file, skipped, "issues left out of the file view");
        }

        Ok(FileIssues(source, bucketized.lines))
    }

    /// Issues introduced between two adjacent versions; empty for any other pair
    pub fn issues_added(&self, label1: &str, label2: &str) -> Result<Vec<VersionDiffRecord>> {
        let v1 = version_id_from_label(label1);
        let v2 = version_id_from_label(label2);
        debug!(v1, v2, "issues added");

        // checked again by extract_version_diff; here it spares loading the table
        if !self.config.version_order.is_adjacent(v1, v2) {
            return Ok(Vec::new());
        }
        let table = self.store.load_diff_table()?;
        let records = extract_version_diff(&self.config.version_order, v1, v2, &table)?;
        Ok(records)
    }

    /// Tag statistics of `v1`, aligned with `v2` when one is given
    pub fn tag_stats(&self, v1: &str, v2: Option<&str>) -> Result<TagStats> {
        debug!(v1, v2 = ?v2, "tag stats");
        let collection = self.store.load_tag_collection()?;
        let first = collection.version(v1)?;

        match v2.filter(|v| !v.is_empty()) {
            None => Ok(TagStats::Single(first.to_vec())),
            Some(v2) => {
                let second = collection.version(v2)?;
                Ok(TagStats::Pair(normalize_tags(first, second)))
            }
        }
    }

    pub fn statistics(&self) -> Result<StatisticsSeries> {
        debug!("statistics");
        let table = self.store.load_statistics()?;
        Ok(summarize_statistics(&table))
    }

    /// Raw `git diff` between the revisions of two versions
    pub fn source_diff(&self, label1: &str, label2: &str) -> Result<String> {
        let rev1 = self.config.revision_for(version_id_from_label(label1));
        let rev2 = self.config.revision_for(version_id_from_label(label2));
        debug!(rev1, rev2, "source diff");

        let repo = self
            .config
            .repository
            .as_deref()
            .context("no repository configured for source diffs")?;
        crate::git::diff_revisions(repo, rev1, rev2)
    }
}
