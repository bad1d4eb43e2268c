//! Property tests for the pure transforms

use proptest::prelude::*;
use qualdash_core::issues::{Flow, FlowLocation, IssueType, Severity, TextRange};
use qualdash_core::metrics_tree::Metric;
use qualdash_core::version_diff::{extract_version_diff, DiffTable};
use qualdash_core::{
    bucketize_issues, normalize_tags, reduce_maxima, Issue, MetricMaxima, MetricNode, TagEntry,
    VersionOrder,
};
use serde_json::{json, Value};

fn metric_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0u32..10_000).prop_map(|v| json!(v)),
        (0.0f64..100.0).prop_map(|v| json!(v)),
        Just(json!("NaN")),
        Just(Value::Null),
    ]
}

fn metrics() -> impl Strategy<Value = Value> {
    prop::collection::vec(metric_value(), 6).prop_map(|values| {
        let mut object = serde_json::Map::new();
        for (metric, value) in Metric::ALL.iter().zip(values) {
            object.insert(metric.key().to_string(), value);
        }
        Value::Object(object)
    })
}

fn tree() -> impl Strategy<Value = Value> {
    let leaf = metrics().prop_map(|m| json!({"value": "file", "metrics": m}));
    leaf.prop_recursive(4, 32, 4, |inner| {
        (metrics(), prop::collection::vec(inner, 0..4))
            .prop_map(|(m, children)| json!({"value": "dir", "metrics": m, "children": children}))
    })
}

/// Every finite metric value reachable the way the reduction walks the tree
fn observed(node: &MetricNode, metric: Metric, out: &mut Vec<f64>) {
    out.extend(node.metric(metric));
    for child in node.children() {
        observed(child, metric, out);
    }
}

fn issue_at(line: Option<u32>, flows: Vec<Vec<u32>>) -> Issue {
    Issue {
        component: "transitfeed:feedvalidator.py".to_string(),
        line,
        issue_type: IssueType::Bug,
        severity: Severity::Major,
        message: "m".to_string(),
        tags: vec![],
        flows: flows
            .into_iter()
            .map(|lines| Flow {
                locations: lines
                    .into_iter()
                    .map(|start_line| FlowLocation {
                        text_range: TextRange { start_line },
                    })
                    .collect(),
            })
            .collect(),
    }
}

proptest! {
    /// Property: each maximum is exactly the largest value observed, never NaN
    #[test]
    fn prop_maxima_match_observed_values(raw in tree()) {
        let node: MetricNode = serde_json::from_value(raw).unwrap();
        let maxima = reduce_maxima(&node, MetricMaxima::default());

        for metric in Metric::ALL {
            let mut values = Vec::new();
            observed(&node, metric, &mut values);
            let expected = values.into_iter().fold(0.0f64, f64::max);
            let actual = maxima.get(metric);
            prop_assert!(!actual.is_nan());
            prop_assert_eq!(actual, expected);
        }
    }

    /// Property: the bucket always covers exactly 0..line_count
    #[test]
    fn prop_bucket_covers_every_line(
        line_count in 0usize..60,
        anchors in prop::collection::vec(prop::option::of(0u32..80), 0..20),
    ) {
        let issues: Vec<Issue> = anchors
            .iter()
            .map(|&line| issue_at(line, vec![]))
            .collect();
        let result = bucketize_issues(&issues, "feedvalidator.py", line_count);

        prop_assert_eq!(result.lines.len(), line_count);
        prop_assert!(result.lines.keys().copied().eq(0..line_count));

        let placeable = anchors
            .iter()
            .filter(|line| matches!(line, Some(l) if (*l as usize) < line_count))
            .count();
        let filed: usize = result.lines.values().map(|l| l.len()).sum();
        prop_assert_eq!(filed, placeable);
        prop_assert_eq!(result.faults.len(), anchors.len() - placeable);
    }

    /// Property: an in-range flow issue files one entry per anchor and flow location
    #[test]
    fn prop_flow_issue_entry_count(
        anchor in prop::option::of(0u32..20),
        flows in prop::collection::vec(prop::collection::vec(0u32..20, 0..4), 0..3),
    ) {
        let expected = anchor.iter().count() + flows.iter().map(Vec::len).sum::<usize>();
        let result = bucketize_issues(&[issue_at(anchor, flows)], "feedvalidator.py", 20);
        let filed: usize = result.lines.values().map(|l| l.len()).sum();
        if expected == 0 {
            prop_assert_eq!(result.faults.len(), 1);
        } else {
            prop_assert_eq!(filed, expected);
        }
    }

    /// Property: both tag vectors share one sorted, zero-filled axis
    #[test]
    fn prop_normalized_tags_are_aligned(
        first in prop::collection::vec(("[a-e]{1,3}", 1u64..50), 0..8),
        second in prop::collection::vec(("[a-e]{1,3}", 1u64..50), 0..8),
    ) {
        let to_entries = |pairs: &[(String, u64)]| -> Vec<TagEntry> {
            pairs.iter().map(|(n, v)| TagEntry::new(n.clone(), *v)).collect()
        };
        let result = normalize_tags(&to_entries(&first), &to_entries(&second));

        prop_assert_eq!(result.v1.len(), result.v2.len());
        let names: Vec<&str> = result.v1.iter().map(TagEntry::name).collect();
        prop_assert!(names.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(result.v2.iter().map(TagEntry::name).eq(names.iter().copied()));

        for (name, value) in result.v1.iter().map(|e| (e.name(), e.value())) {
            if !first.iter().any(|(n, _)| n == name) {
                prop_assert_eq!(value.as_u64(), Some(0));
            }
        }
    }

    /// Property: only directly adjacent pairs ever yield records
    #[test]
    fn prop_non_adjacent_pairs_are_empty(i in 0usize..6, j in 0usize..6) {
        let ids: Vec<String> = (0..6).map(|n| format!("v{}", n)).collect();
        let order = VersionOrder::new(ids.clone());
        let table = DiffTable::new(
            ids.windows(2)
                .map(|w| {
                    let record = serde_json::to_value(issue_at(Some(1), vec![])).unwrap();
                    (format!("{}&{}", w[0], w[1]), vec![record])
                })
                .collect(),
        );

        let records = extract_version_diff(&order, &ids[i], &ids[j], &table).unwrap();
        if j == i + 1 {
            prop_assert_eq!(records.len(), 1);
        } else {
            prop_assert!(records.is_empty());
        }
    }
}
