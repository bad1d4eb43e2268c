//! Metric tree reduction - radar-chart axis scales
//!
//! Folds the per-node quality metrics of a version's directory/file tree into
//! six running maxima. Two trees folded into one accumulator give the shared
//! axis scale of the paired radar view.
//!
//! Global invariants enforced:
//! - The root's own metrics count once, then every descendant
//! - Only `dir` nodes are descended into
//! - NaN, missing and non-numeric values never update (and never poison) a maximum
//! - The accumulator is owned by the caller; no state survives a call

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind tag of directory nodes
pub const DIR_KIND: &str = "dir";

/// One node of a version's metrics tree.
///
/// Fields other than `value`, `metrics` and `children` are carried along
/// untouched so a tree can be handed back to the front-end as it was read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricNode {
    /// Kind tag (`"dir"` for directories); other kinds are not interpreted
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metrics: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MetricNode>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metrics tracked by the radar charts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Bugs,
    CodeSmells,
    Vulnerabilities,
    CognitiveComplexity,
    DuplicatedLinesDensity,
    CommentLinesDensity,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Bugs,
        Metric::CodeSmells,
        Metric::Vulnerabilities,
        Metric::CognitiveComplexity,
        Metric::DuplicatedLinesDensity,
        Metric::CommentLinesDensity,
    ];

    /// Key of the metric inside a node's `metrics` object
    pub fn key(self) -> &'static str {
        match self {
            Metric::Bugs => "bugs",
            Metric::CodeSmells => "code_smells",
            Metric::Vulnerabilities => "vulnerabilities",
            Metric::CognitiveComplexity => "cognitive_complexity",
            Metric::DuplicatedLinesDensity => "duplicated_lines_density",
            Metric::CommentLinesDensity => "comment_lines_density",
        }
    }
}

impl MetricNode {
    pub fn is_dir(&self) -> bool {
        self.value.as_str() == Some(DIR_KIND)
    }

    /// Children of a directory node; leaves have none, whatever the JSON says
    pub fn children(&self) -> &[MetricNode] {
        if !self.is_dir() {
            return &[];
        }
        self.children.as_deref().unwrap_or_default()
    }

    /// Numeric value of a metric, or None when absent, NaN or not a number.
    ///
    /// Numeric strings are accepted since some exports quote their densities.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        let raw = self.metrics.get(metric.key())?;
        let value = match raw {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// Running maxima, serialized with the field names the radar view reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricMaxima {
    #[serde(rename = "bugMax")]
    pub bugs: f64,
    #[serde(rename = "code_smellMax")]
    pub code_smells: f64,
    #[serde(rename = "vulnerabilityMax")]
    pub vulnerabilities: f64,
    #[serde(rename = "ccMax")]
    pub cognitive_complexity: f64,
    #[serde(rename = "dlMax")]
    pub duplicated_lines_density: f64,
    #[serde(rename = "clMax")]
    pub comment_lines_density: f64,
}

impl MetricMaxima {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Bugs => self.bugs,
            Metric::CodeSmells => self.code_smells,
            Metric::Vulnerabilities => self.vulnerabilities,
            Metric::CognitiveComplexity => self.cognitive_complexity,
            Metric::DuplicatedLinesDensity => self.duplicated_lines_density,
            Metric::CommentLinesDensity => self.comment_lines_density,
        }
    }

    fn slot(&mut self, metric: Metric) -> &mut f64 {
        match metric {
            Metric::Bugs => &mut self.bugs,
            Metric::CodeSmells => &mut self.code_smells,
            Metric::Vulnerabilities => &mut self.vulnerabilities,
            Metric::CognitiveComplexity => &mut self.cognitive_complexity,
            Metric::DuplicatedLinesDensity => &mut self.duplicated_lines_density,
            Metric::CommentLinesDensity => &mut self.comment_lines_density,
        }
    }

    /// Fold one node's own metrics (not its children)
    fn observe(&mut self, node: &MetricNode) {
        for metric in Metric::ALL {
            if let Some(value) = node.metric(metric) {
                let slot = self.slot(metric);
                if value > *slot {
                    *slot = value;
                }
            }
        }
    }
}

/// Fold a whole tree into `acc` and return it.
///
/// The root contributes its own (aggregate) metrics, then every descendant
/// reachable through `dir` nodes contributes once.
pub fn reduce_maxima(tree: &MetricNode, mut acc: MetricMaxima) -> MetricMaxima {
    acc.observe(tree);
    fold_children(tree, &mut acc);
    acc
}

fn fold_children(node: &MetricNode, acc: &mut MetricMaxima) {
    for child in node.children() {
        acc.observe(child);
        fold_children(child, acc);
    }
}

/// Union maxima of two versions, used as the shared paired-radar scale
pub fn paired_maxima(first: &MetricNode, second: &MetricNode) -> MetricMaxima {
    let acc = reduce_maxima(first, MetricMaxima::default());
    reduce_maxima(second, acc)
}
