//! Issues introduced between adjacent versions
//!
//! The version-diff table is precomputed upstream for every adjacent pair of
//! the release order; this module checks adjacency and reshapes the pair's
//! records for the diff panel.
//!
//! Global invariants enforced:
//! - The release order is configuration; it is never inferred or reordered
//! - A non-adjacent pair yields an empty list, not an error
//! - An adjacent pair missing from the table is a data-integrity error
//! - Only the requested pair's records are decoded; other entries never fail it
//! - Output keeps the table's record order

use crate::error::{EngineError, EngineResult};
use crate::issues::{component_path, Issue, IssueType, Severity};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Separator between the two version ids of a diff-table key
pub const PAIR_SEPARATOR: char = '&';

/// Separator between the ordinal and the version id of a front-end label
pub const LABEL_SEPARATOR: &str = "--";

/// Canonical release order of every known version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionOrder(Vec<String>);

impl VersionOrder {
    pub fn new(versions: Vec<String>) -> Self {
        VersionOrder(versions)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `next` directly follows `prev` in the release order
    pub fn is_adjacent(&self, prev: &str, next: &str) -> bool {
        self.0.windows(2).any(|pair| pair[0] == prev && pair[1] == next)
    }
}

/// Version id of a front-end label (`"3--transitfeed-1.1.0"` -> `"transitfeed-1.1.0"`).
///
/// A label without an ordinal is already a version id.
pub fn version_id_from_label(label: &str) -> &str {
    label
        .split_once(LABEL_SEPARATOR)
        .map_or(label, |(_, id)| id)
}

/// Diff-table key of an adjacent pair
pub fn diff_key(prev: &str, next: &str) -> String {
    format!("{}{}{}", prev, PAIR_SEPARATOR, next)
}

/// `"<v1>&<v2>"` -> issues new in `v2`
///
/// Records stay raw until a pair is requested, so a bad record only
/// affects the pair it is filed under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffTable(HashMap<String, Vec<Value>>);

impl DiffTable {
    pub fn new(entries: HashMap<String, Vec<Value>>) -> Self {
        DiffTable(entries)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to deserialize issue diff table from JSON")
    }

    pub fn get(&self, key: &str) -> Option<&[Value]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Decoded issues of one pair, or None when the table has no such key
    pub fn issues(&self, key: &str) -> Option<EngineResult<Vec<Issue>>> {
        let records = self.get(key)?;
        Some(
            records
                .iter()
                .enumerate()
                .map(|(index, raw)| {
                    Issue::deserialize(raw).map_err(|e| {
                        EngineError::MalformedIssue(format!("{} record {}: {}", key, index, e))
                    })
                })
                .collect(),
        )
    }
}

/// One newly introduced issue, as the diff panel lists it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiffRecord {
    pub filename: String,
    pub line: Option<u32>,
    #[serde(rename = "severityAdd")]
    pub severity_add: Severity,
    pub description: String,
    pub tag: IssueType,
}

impl VersionDiffRecord {
    fn from_issue(issue: &Issue) -> EngineResult<Self> {
        Ok(VersionDiffRecord {
            filename: component_path(&issue.component)?.to_string(),
            line: issue.line,
            severity_add: issue.severity,
            description: issue.message.clone(),
            tag: issue.issue_type,
        })
    }
}

/// Issues introduced going from `v1` to `v2`.
///
/// # Errors
///
/// Returns error if:
/// - The pair is adjacent but the table has no entry for it
/// - A record of the pair does not decode as an issue
/// - A record's component has no `:` separator
pub fn extract_version_diff(
    order: &VersionOrder,
    v1: &str,
    v2: &str,
    table: &DiffTable,
) -> EngineResult<Vec<VersionDiffRecord>> {
    if !order.is_adjacent(v1, v2) {
        return Ok(Vec::new());
    }

    let key = diff_key(v1, v2);
    let issues = match table.issues(&key) {
        Some(decoded) => decoded?,
        None => return Err(EngineError::DiffEntryMissing { key }),
    };

    issues.iter().map(VersionDiffRecord::from_issue).collect()
}
