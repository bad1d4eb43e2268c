//! Static-analysis issues and per-line bucketing
//!
//! Decodes the upstream issue dumps and files every issue of one source file
//! under the lines it touches, split by issue type.
//!
//! Global invariants enforced:
//! - Every line 0..line_count has a bucket, even when empty
//! - Flow-based issues are filed at the anchor line AND every flow location
//! - Anchor and flow entries on the same line are kept separately
//! - One bad issue is recorded as a fault; it never aborts the batch
//! - An issue files all of its entries or none

use crate::error::{EngineError, EngineResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Issue type as reported by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    CodeSmell,
    Bug,
    Vulnerability,
}

/// Issue severity as reported by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Blocker,
    Critical,
    Major,
    Minor,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    #[serde(rename = "startLine")]
    pub start_line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLocation {
    #[serde(rename = "textRange")]
    pub text_range: TextRange,
}

/// Ordered path of locations implicated together in one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub locations: Vec<FlowLocation>,
}

/// One static-analysis finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

/// File path of a component, the text after the first `:`.
///
/// Components look like `<project key>:<path>`; one without the separator is
/// rejected rather than matched against nothing.
pub fn component_path(component: &str) -> EngineResult<&str> {
    component
        .split_once(':')
        .map(|(_, path)| path)
        .ok_or_else(|| EngineError::MalformedComponent {
            component: component.to_string(),
        })
}

impl Issue {
    pub fn file_path(&self) -> EngineResult<&str> {
        component_path(&self.component)
    }

    /// Start lines of every location of every flow, in flow order
    pub fn flow_lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.flows
            .iter()
            .flat_map(|flow| flow.locations.iter())
            .map(|location| location.text_range.start_line)
    }

    fn entry(&self) -> IssueEntry {
        IssueEntry(self.severity, self.message.clone(), self.tags.clone())
    }
}

/// A rejected issue and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFault {
    pub index: usize,
    pub error: EngineError,
}

/// Issue dump of one version (`{"issues": [...]}`)
///
/// Records are kept raw until [`IssueDump::decode`] so that one record of an
/// unexpected shape costs that record only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueDump {
    #[serde(default)]
    pub issues: Vec<Value>,
}

impl IssueDump {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to deserialize issue dump from JSON")
    }

    /// Decode every record, setting aside the ones that are not issues
    pub fn decode(&self) -> (Vec<Issue>, Vec<IssueFault>) {
        let mut issues = Vec::with_capacity(self.issues.len());
        let mut faults = Vec::new();
        for (index, raw) in self.issues.iter().enumerate() {
            match Issue::deserialize(raw) {
                Ok(issue) => issues.push(issue),
                Err(e) => {
                    let error = EngineError::MalformedIssue(e.to_string());
                    warn!(index, %error, "skipping undecodable issue record");
                    faults.push(IssueFault { index, error });
                }
            }
        }
        (issues, faults)
    }
}

/// `[severity, message, tags]` triple shown in the line gutter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEntry(pub Severity, pub String, pub Vec<String>);

/// Issues filed under one line, by type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIssues {
    #[serde(rename = "CODE_SMELL")]
    pub code_smell: Vec<IssueEntry>,
    #[serde(rename = "BUG")]
    pub bug: Vec<IssueEntry>,
    #[serde(rename = "VULNERABILITY")]
    pub vulnerability: Vec<IssueEntry>,
}

impl LineIssues {
    pub fn of_type(&self, issue_type: IssueType) -> &[IssueEntry] {
        match issue_type {
            IssueType::CodeSmell => &self.code_smell,
            IssueType::Bug => &self.bug,
            IssueType::Vulnerability => &self.vulnerability,
        }
    }

    fn of_type_mut(&mut self, issue_type: IssueType) -> &mut Vec<IssueEntry> {
        match issue_type {
            IssueType::CodeSmell => &mut self.code_smell,
            IssueType::Bug => &mut self.bug,
            IssueType::Vulnerability => &mut self.vulnerability,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_smell.is_empty() && self.bug.is_empty() && self.vulnerability.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_smell.len() + self.bug.len() + self.vulnerability.len()
    }
}

/// Line number -> issues on that line; every line of the file is present
pub type LineIssueBucket = BTreeMap<usize, LineIssues>;

/// Result of bucketing one file's issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucketized {
    pub lines: LineIssueBucket,
    pub faults: Vec<IssueFault>,
}

/// Number of lines the gutter shows for a source text (`\n`-separated segments)
pub fn count_lines(source: &str) -> usize {
    source.split('\n').count()
}

/// File every issue of `target_file` under the lines it touches.
///
/// Issues of other files are ignored. Issues that cannot be placed (malformed
/// component, no line at all, a line outside `0..line_count`) are returned as
/// faults and logged; the remaining issues are unaffected.
pub fn bucketize_issues(issues: &[Issue], target_file: &str, line_count: usize) -> Bucketized {
    let mut lines: LineIssueBucket = (0..line_count)
        .map(|line| (line, LineIssues::default()))
        .collect();
    let mut faults = Vec::new();

    for (index, issue) in issues.iter().enumerate() {
        match placement(issue, target_file, line_count) {
            Ok(None) => {}
            Ok(Some(targets)) => {
                let entry = issue.entry();
                for line in targets {
                    if let Some(bucket) = lines.get_mut(&line) {
                        bucket.of_type_mut(issue.issue_type).push(entry.clone());
                    }
                }
            }
            Err(error) => {
                warn!(index, component = %issue.component, %error, "skipping issue");
                faults.push(IssueFault { index, error });
            }
        }
    }

    Bucketized { lines, faults }
}

/// Lines an issue is filed under, or None when it belongs to another file
fn placement(issue: &Issue, target_file: &str, line_count: usize) -> EngineResult<Option<Vec<usize>>> {
    if issue.file_path()? != target_file {
        return Ok(None);
    }

    let targets: Vec<u32> = issue.line.into_iter().chain(issue.flow_lines()).collect();
    if targets.is_empty() {
        return Err(EngineError::MissingAnchorLine);
    }

    targets
        .into_iter()
        .map(|line| {
            let index = line as usize;
            if index < line_count {
                Ok(index)
            } else {
                Err(EngineError::LineOutOfRange { line, line_count })
            }
        })
        .collect::<EngineResult<Vec<_>>>()
        .map(Some)
}
