//! Tag statistics alignment
//!
//! Each version carries a sparse list of `[tag, count]` pairs. Comparing two
//! versions on one radar needs both lists over the same axes, in the same order.
//!
//! Global invariants enforced:
//! - Both vectors cover the sorted union of tag names
//! - Names absent from one version get `0`
//! - Byte-wise lexical ordering (not locale-aware)

use crate::error::{EngineError, EngineResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::{BTreeSet, HashMap};

/// One `[tag name, value]` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry(pub String, pub Number);

impl TagEntry {
    pub fn new(name: impl Into<String>, value: impl Into<Number>) -> Self {
        TagEntry(name.into(), value.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> &Number {
        &self.1
    }
}

/// Two versions' tag vectors over a shared axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagComparison {
    pub v1: Vec<TagEntry>,
    pub v2: Vec<TagEntry>,
}

/// Version id -> tag list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagCollection(HashMap<String, Vec<TagEntry>>);

impl TagCollection {
    pub fn new(entries: HashMap<String, Vec<TagEntry>>) -> Self {
        TagCollection(entries)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to deserialize tag collection from JSON")
    }

    /// Tag list of one version; a version without an entry is an error
    pub fn version(&self, version: &str) -> EngineResult<&[TagEntry]> {
        self.0
            .get(version)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::TagEntryMissing {
                version: version.to_string(),
            })
    }
}

/// Re-express two sparse tag lists as dense vectors over the sorted union of names.
///
/// On duplicate names within one list the last value wins.
pub fn normalize_tags(first: &[TagEntry], second: &[TagEntry]) -> TagComparison {
    let first_values = index_by_name(first);
    let second_values = index_by_name(second);

    let all_names: BTreeSet<&str> = first_values
        .keys()
        .chain(second_values.keys())
        .copied()
        .collect();

    let align = |values: &HashMap<&str, &Number>| -> Vec<TagEntry> {
        all_names
            .iter()
            .map(|&name| {
                let value = values.get(name).map_or_else(|| Number::from(0), |&v| v.clone());
                TagEntry(name.to_string(), value)
            })
            .collect()
    };

    TagComparison {
        v1: align(&first_values),
        v2: align(&second_values),
    }
}

fn index_by_name(entries: &[TagEntry]) -> HashMap<&str, &Number> {
    entries
        .iter()
        .map(|entry| (entry.name(), entry.value()))
        .collect()
}
