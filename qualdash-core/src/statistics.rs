//! Release statistics series for the overview chart

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-version statistics as stored (`{"<key>": {"ncloc", "files", "metrics"}}`).
///
/// Key order is the file's order, which is the chart's x-axis order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsTable(Map<String, Value>);

impl StatisticsTable {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to deserialize statistics table from JSON")
    }
}

/// `[categories, ncloc, files, metrics]`, one column per version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSeries(
    pub Vec<String>,
    pub Vec<Value>,
    pub Vec<Value>,
    pub Vec<Value>,
);

/// Category shown under a column: the text between the first and second `-`
/// of the key (`transitfeed-1.0.7` -> `1.0.7`), empty when the key has no `-`.
pub fn category_of(key: &str) -> &str {
    key.split('-').nth(1).unwrap_or_default()
}

pub fn summarize_statistics(table: &StatisticsTable) -> StatisticsSeries {
    let mut series = StatisticsSeries::default();
    for (key, entry) in &table.0 {
        let field = |name: &str| entry.get(name).cloned().unwrap_or(Value::Null);
        series.0.push(category_of(key).to_string());
        series.1.push(field("ncloc"));
        series.2.push(field("files"));
        series.3.push(field("metrics"));
    }
    series
}
