//! Flat-file data store
//!
//! Resolves and reads the precomputed artifacts of the dashboard's data
//! directory. Nothing here is cached; every call reads the file again.
//!
//! Global invariants enforced:
//! - Read-only: the store never writes into the data directory
//! - Caller-supplied versions and paths cannot escape the data directory
//! - Every read error names the file it failed on
//!
//! Layout:
//!
//! ```text
//! <root>/PYfileWithTCMstatics.json
//! <root>/everyVersion/<version>.json
//! <root>/fileIssues/<version>-issues.json
//! <root>/source/<version>/<file path>
//! <root>/issuesDiff.json
//! <root>/tagCollection.json
//! <root>/statistics.json
//! ```

use crate::error::{EngineError, EngineResult};
use crate::issues::IssueDump;
use crate::metrics_tree::MetricNode;
use crate::statistics::StatisticsTable;
use crate::tags::TagCollection;
use crate::version_diff::DiffTable;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

pub const OVERVIEW_FILE: &str = "PYfileWithTCMstatics.json";
pub const METRIC_TREES_DIR: &str = "everyVersion";
pub const ISSUES_DIR: &str = "fileIssues";
pub const SOURCES_DIR: &str = "source";
pub const ISSUES_DIFF_FILE: &str = "issuesDiff.json";
pub const TAG_COLLECTION_FILE: &str = "tagCollection.json";
pub const STATISTICS_FILE: &str = "statistics.json";

/// Read-only view of a data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn overview_path(&self) -> PathBuf {
        self.root.join(OVERVIEW_FILE)
    }

    pub fn metric_tree_path(&self, version: &str) -> EngineResult<PathBuf> {
        let version = checked_version(version)?;
        Ok(self
            .root
            .join(METRIC_TREES_DIR)
            .join(format!("{}.json", version)))
    }

    pub fn issues_path(&self, version: &str) -> EngineResult<PathBuf> {
        let version = checked_version(version)?;
        Ok(self
            .root
            .join(ISSUES_DIR)
            .join(format!("{}-issues.json", version)))
    }

    pub fn source_path(&self, version: &str, file: &str) -> EngineResult<PathBuf> {
        let version = checked_version(version)?;
        let file = checked_relative_path(file)?;
        Ok(self.root.join(SOURCES_DIR).join(version).join(file))
    }

    pub fn issues_diff_path(&self) -> PathBuf {
        self.root.join(ISSUES_DIFF_FILE)
    }

    pub fn tag_collection_path(&self) -> PathBuf {
        self.root.join(TAG_COLLECTION_FILE)
    }

    pub fn statistics_path(&self) -> PathBuf {
        self.root.join(STATISTICS_FILE)
    }

    /// Overview data, returned as stored
    pub fn load_overview(&self) -> Result<String> {
        read_text(&self.overview_path())
    }

    pub fn load_metric_tree(&self, version: &str) -> Result<MetricNode> {
        let path = self.metric_tree_path(version)?;
        let json = read_text(&path)?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse metric tree: {}", path.display()))
    }

    pub fn load_issue_dump(&self, version: &str) -> Result<IssueDump> {
        let path = self.issues_path(version)?;
        let json = read_text(&path)?;
        IssueDump::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    pub fn load_source(&self, version: &str, file: &str) -> Result<String> {
        read_text(&self.source_path(version, file)?)
    }

    pub fn load_diff_table(&self) -> Result<DiffTable> {
        let path = self.issues_diff_path();
        let json = read_text(&path)?;
        DiffTable::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    pub fn load_tag_collection(&self) -> Result<TagCollection> {
        let path = self.tag_collection_path();
        let json = read_text(&path)?;
        TagCollection::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    pub fn load_statistics(&self) -> Result<StatisticsTable> {
        let path = self.statistics_path();
        let json = read_text(&path)?;
        StatisticsTable::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Versions that have a metric tree, sorted (ASCII lexical, not release order)
    pub fn list_versions(&self) -> Result<Vec<String>> {
        let dir = self.root.join(METRIC_TREES_DIR);
        let mut versions = Vec::new();
        for entry_result in std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read directory: {}", dir.display()))?
        {
            let entry = entry_result?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                versions.push(stem.to_string());
            }
        }
        versions.sort();
        Ok(versions)
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// A version id must be a single plain path segment
fn checked_version(version: &str) -> EngineResult<&str> {
    let mut components = Path::new(version).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(version),
        _ => Err(EngineError::InvalidRequest(format!(
            "version {:?} is not a plain identifier",
            version
        ))),
    }
}

/// A file path must be relative and made of plain segments only
fn checked_relative_path(file: &str) -> EngineResult<&Path> {
    let path = Path::new(file);
    let plain = path.components().count() > 0
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(path)
    } else {
        Err(EngineError::InvalidRequest(format!(
            "file {:?} is not a relative path inside the version",
            file
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_paths() {
        let store = DataStore::new("/data");
        assert_eq!(
            store.metric_tree_path("transitfeed-1.0.7").unwrap(),
            PathBuf::from("/data/everyVersion/transitfeed-1.0.7.json")
        );
        assert_eq!(
            store.issues_path("transitfeed-1.0.7").unwrap(),
            PathBuf::from("/data/fileIssues/transitfeed-1.0.7-issues.json")
        );
        assert_eq!(
            store
                .source_path("transitfeed-1.0.7", "transitfeed/stop.py")
                .unwrap(),
            PathBuf::from("/data/source/transitfeed-1.0.7/transitfeed/stop.py")
        );
    }

    #[test]
    fn test_rejects_escaping_identifiers() {
        let store = DataStore::new("/data");
        assert!(store.metric_tree_path("../etc").is_err());
        assert!(store.metric_tree_path("a/b").is_err());
        assert!(store.metric_tree_path("").is_err());
        assert!(store.source_path("v", "../../secret").is_err());
        assert!(store.source_path("v", "/etc/passwd").is_err());
        assert!(store.source_path("v", "").is_err());
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let temp = tempfile::tempdir().unwrap();
        let store = DataStore::new(temp.path());
        let err = store.load_metric_tree("transitfeed-1.0.7").unwrap_err();
        assert!(format!("{:#}", err).contains("transitfeed-1.0.7.json"));
    }

    #[test]
    fn test_list_versions() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join(METRIC_TREES_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("transitfeed-1.0.8.json"), "{}").unwrap();
        fs::write(dir.join("transitfeed-1.0.7.json"), "{}").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();

        let store = DataStore::new(temp.path());
        assert_eq!(
            store.list_versions().unwrap(),
            vec!["transitfeed-1.0.7", "transitfeed-1.0.8"]
        );
    }
}
